//! Retry policy for endpoint clients.

use std::io::ErrorKind;
use std::time::Duration;

use crate::client::ClientError;
use crate::config::EndpointConfig;
use crate::resilience::backoff::calculate_backoff;

/// Whether a failed attempt may be repeated on the same endpoint.
///
/// Resets and EOF count as transient even when they follow a completed
/// write, so the server may already have run the command.
pub fn is_retryable(err: &ClientError) -> bool {
    match err {
        ClientError::Io(e) => matches!(
            e.kind(),
            ErrorKind::ConnectionRefused
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::BrokenPipe
                | ErrorKind::UnexpectedEof
                | ErrorKind::NotConnected
        ),
        ClientError::Timeout { op, .. } => *op == "dial",
        ClientError::PoolTimeout
        | ClientError::Closed
        | ClientError::Protocol(_)
        | ClientError::Server(_)
        | ClientError::InvalidConfig(_) => false,
    }
}

/// Retry limits taken from an endpoint config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &EndpointConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            min_backoff: config.min_retry_backoff(),
            max_backoff: config.max_retry_backoff(),
        }
    }

    /// Delay before retry `retry` (1-based) if `err` allows another attempt.
    pub fn next_delay(&self, retry: u32, err: &ClientError) -> Option<Duration> {
        if retry > self.max_retries || !is_retryable(err) {
            return None;
        }
        Some(calculate_backoff(retry, self.min_backoff, self.max_backoff))
    }
}
