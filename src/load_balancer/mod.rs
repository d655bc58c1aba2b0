//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Endpoint list changes (startup, config reload)
//!     → pool.rs reconcile (diff against the active snapshot)
//!         - retained endpoints keep their client
//!         - new endpoints get a client from the factory
//!     → publish new snapshot (ArcSwap)
//!     → close clients of removed endpoints
//!
//! Caller
//!     → pool.rs select
//!     → round_robin.rs (advance shared cursor, bounded by snapshot length)
//!     → endpoint.rs PooledClient handed back to the caller
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable and sorted by address, so equal memberships
//!   always rotate in the same order
//! - Selection never takes a lock; reconcile never blocks selection
//! - Publish before close: a retired client is never handed to a new caller

pub mod endpoint;
pub mod pool;
pub mod round_robin;
pub mod types;

pub use endpoint::{AddrParseError, EndpointAddr, PooledClient};
pub use pool::{Member, ProxyPool, Snapshot};
pub use round_robin::RoundRobin;
pub use types::{PoolError, PoolResult, ReconcileReport};
