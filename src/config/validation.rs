//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every endpoint parses and matches the configured transport
//! - Value ranges (pool size, timeouts, backoff bounds)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PoolConfig → Result<(), Vec<ValidationError>>
//! - An empty endpoint list is valid (the pool starts empty)

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{PoolConfig, Transport, MAX_POOL_SIZE};
use crate::load_balancer::endpoint::EndpointAddr;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("endpoint '{0}' is listed more than once")]
    DuplicateEndpoint(String),

    #[error("client.pool_size must be between 1 and {}, got {}", MAX_POOL_SIZE, .0)]
    PoolSize(usize),

    #[error("client.dial_timeout_ms must be greater than zero")]
    ZeroDialTimeout,

    #[error("client.min_retry_backoff_ms ({min}) exceeds client.max_retry_backoff_ms ({max})")]
    BackoffRange { min: u64, max: u64 },

    #[error("client.username requires client.password")]
    UsernameWithoutPassword,

    #[error("unknown log level '{0}'")]
    LogLevel(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &PoolConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let client = &config.client;

    let mut seen = HashSet::new();
    for endpoint in &config.pool.endpoints {
        match endpoint.parse::<EndpointAddr>() {
            Ok(addr) => {
                let reason = match client.transport {
                    Transport::Tcp if addr.is_unix_path() => Some("tcp transport needs host:port"),
                    Transport::Unix if !addr.is_unix_path() => Some("unix transport needs an absolute socket path"),
                    _ => None,
                };
                if let Some(reason) = reason {
                    errors.push(ValidationError::InvalidEndpoint {
                        endpoint: endpoint.clone(),
                        reason: reason.to_string(),
                    });
                } else if !seen.insert(addr) {
                    errors.push(ValidationError::DuplicateEndpoint(endpoint.trim().to_string()));
                }
            }
            Err(e) => errors.push(ValidationError::InvalidEndpoint {
                endpoint: endpoint.clone(),
                reason: e.reason.to_string(),
            }),
        }
    }

    if client.pool_size == 0 || client.pool_size > MAX_POOL_SIZE {
        errors.push(ValidationError::PoolSize(client.pool_size));
    }
    if client.dial_timeout_ms == 0 {
        errors.push(ValidationError::ZeroDialTimeout);
    }
    if client.min_retry_backoff_ms > client.max_retry_backoff_ms {
        errors.push(ValidationError::BackoffRange {
            min: client.min_retry_backoff_ms,
            max: client.max_retry_backoff_ms,
        });
    }
    if client.username.is_some() && client.password.is_none() {
        errors.push(ValidationError::UsernameWithoutPassword);
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::LogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
