//! Endpoint client subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyPool::reconcile
//!     → ClientFactory::create (base config + endpoint address)
//!     → EndpointClient stored in the pool snapshot
//!
//! Caller:
//!     → ProxyPool::select
//!     → EndpointClient::issue(Command) → Reply
//! ```
//!
//! # Design Decisions
//! - The pool only depends on the two traits below; the RESP client is one
//!   implementation and tests substitute their own
//! - Creating a client is cheap and does no I/O; connections are dialed on
//!   first use
//! - `close` is synchronous so retiring a client never blocks selection

pub mod connection;
pub mod redis;
pub mod resp;

use std::future::Future;
use thiserror::Error;

use crate::config::EndpointConfig;

pub use redis::{RespClient, RespClientFactory};
pub use resp::{Command, ProtocolError, Reply};

/// Errors raised by an endpoint client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Socket level failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An operation ran past its deadline.
    #[error("{op} timed out after {after_ms} ms")]
    Timeout { op: &'static str, after_ms: u64 },

    /// No connection became free within the pool timeout.
    #[error("timed out waiting for a free connection")]
    PoolTimeout,

    /// The client was closed.
    #[error("client is closed")]
    Closed,

    /// The endpoint sent something that is not valid RESP.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The endpoint answered with an error reply.
    #[error("server error: {0}")]
    Server(String),

    /// The client cannot be built from the given settings.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// A handle that issues commands to one proxy endpoint.
pub trait EndpointClient: Send + Sync + 'static {
    /// Send one command and wait for its reply. Error replies are returned
    /// as `ClientError::Server`.
    fn issue(&self, command: Command) -> impl Future<Output = ClientResult<Reply>> + Send;

    /// Release the client's resources. Closing twice reports
    /// `ClientError::Closed`.
    fn close(&self) -> ClientResult<()>;
}

/// Builds endpoint clients for the pool.
pub trait ClientFactory: Send + Sync + 'static {
    type Client: EndpointClient;

    /// Build a client from a config whose `address` is set.
    fn create(&self, config: &EndpointConfig) -> ClientResult<Self::Client>;
}
