//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pool and clients produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters and gauges via the `metrics` facade)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Prometheus scrape endpoint (CLI, when enabled)
//! ```
//!
//! # Design Decisions
//! - The library only emits; installing a subscriber or recorder is left to
//!   the binary, so embedding applications keep their own setup
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
