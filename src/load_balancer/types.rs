//! Pool error definitions and reconcile reporting.

use thiserror::Error;

use crate::client::ClientError;
use crate::load_balancer::endpoint::EndpointAddr;

/// Errors returned by the proxy pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// `select` was called while the pool has no members.
    #[error("proxy pool is empty")]
    Empty,

    /// The client factory could not build a client for a newly added
    /// endpoint. The membership was left unchanged.
    #[error("failed to create client for endpoint {addr}: {source}")]
    Connect {
        addr: EndpointAddr,
        #[source]
        source: ClientError,
    },
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Outcome of one reconcile call, each list in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Endpoints that got a freshly created client.
    pub added: Vec<EndpointAddr>,
    /// Endpoints whose existing client was carried over.
    pub retained: Vec<EndpointAddr>,
    /// Endpoints that left rotation and had their client closed.
    pub removed: Vec<EndpointAddr>,
}

impl ReconcileReport {
    /// True when the membership did not change.
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
