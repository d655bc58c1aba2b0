//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! EndpointClient::issue:
//!     → attempt fails
//!     → retries.rs (is the error transient? attempts left?)
//!     → backoff.rs (jittered delay between min and max backoff)
//!     → next attempt
//! ```
//!
//! # Design Decisions
//! - Connection-level failures are retried: refused or timed-out dials, and
//!   resets or EOF on a connection. A reset can arrive after the command was
//!   written, so a retried command may run twice (at-least-once); callers
//!   sending non-idempotent commands set `max_retries = 0`
//! - Read timeouts are not retried
//! - Server error replies are never retried
//! - Retries are per endpoint; the pool never fails over to another member

pub mod backoff;
pub mod retries;
