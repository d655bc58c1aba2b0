//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the pool.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::load_balancer::endpoint::{AddrParseError, EndpointAddr};

/// Upper bound for `client.pool_size`.
pub const MAX_POOL_SIZE: usize = 10_000;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct PoolConfig {
    /// Endpoint membership.
    pub pool: MembershipConfig,

    /// Base client settings, cloned for every endpoint.
    pub client: EndpointConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl PoolConfig {
    /// Parse the configured endpoint list.
    pub fn endpoint_addrs(&self) -> Result<Vec<EndpointAddr>, AddrParseError> {
        self.pool.endpoints.iter().map(|e| e.parse()).collect()
    }
}

/// Endpoint membership configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct MembershipConfig {
    /// Proxy endpoints (e.g., "10.0.0.1:19000"), in any order.
    pub endpoints: Vec<String>,
}

/// How an endpoint client reaches its proxy.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Tcp,
    Unix,
}

/// Settings for one endpoint client.
///
/// The pool keeps one base copy and derives the per-endpoint copy with
/// [`EndpointConfig::for_address`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EndpointConfig {
    /// Endpoint address. Never read from the config file; set per endpoint.
    #[serde(skip)]
    pub address: Option<EndpointAddr>,

    /// Network transport.
    pub transport: Transport,

    /// ACL username sent with AUTH (requires `password`).
    pub username: Option<String>,

    /// Password sent with AUTH after connecting.
    pub password: Option<String>,

    /// Logical database selected after connecting.
    pub db: u32,

    /// Retries for transient network failures (0 = no retries).
    pub max_retries: u32,

    /// Lower bound of the retry backoff in milliseconds.
    pub min_retry_backoff_ms: u64,

    /// Upper bound of the retry backoff in milliseconds.
    pub max_retry_backoff_ms: u64,

    /// Connection establishment timeout in milliseconds.
    pub dial_timeout_ms: u64,

    /// Reply read timeout in milliseconds (0 = no timeout).
    pub read_timeout_ms: u64,

    /// Command write timeout in milliseconds (0 = no timeout).
    pub write_timeout_ms: u64,

    /// Maximum connections per endpoint (1 to [`MAX_POOL_SIZE`]).
    pub pool_size: usize,

    /// How long a request waits for a free connection, in milliseconds.
    pub pool_timeout_ms: u64,

    /// Idle connections older than this are discarded (0 = keep forever).
    pub idle_timeout_secs: u64,

    /// Optional TLS settings.
    pub tls: Option<TlsConfig>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            address: None,
            transport: Transport::Tcp,
            username: None,
            password: None,
            db: 0,
            max_retries: 0,
            min_retry_backoff_ms: 8,
            max_retry_backoff_ms: 512,
            dial_timeout_ms: 5_000,
            read_timeout_ms: 3_000,
            write_timeout_ms: 3_000,
            pool_size: 10,
            pool_timeout_ms: 4_000,
            idle_timeout_secs: 300,
            tls: None,
        }
    }
}

impl EndpointConfig {
    /// Copy of this config bound to `addr`. Every other field is kept as is.
    pub fn for_address(&self, addr: EndpointAddr) -> Self {
        Self {
            address: Some(addr),
            ..self.clone()
        }
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.write_timeout_ms)
    }

    pub fn pool_timeout(&self) -> Duration {
        Duration::from_millis(self.pool_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn min_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.min_retry_backoff_ms)
    }

    pub fn max_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.max_retry_backoff_ms)
    }
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// TLS configuration for endpoint connections.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TlsConfig {
    /// Server name used for certificate verification.
    pub server_name: Option<String>,

    /// Path to a CA bundle (PEM).
    pub ca_cert_path: Option<String>,

    /// Skip certificate verification.
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_address_copies_everything_else() {
        let base = EndpointConfig {
            password: Some("secret".into()),
            db: 3,
            max_retries: 2,
            pool_size: 4,
            tls: Some(TlsConfig {
                server_name: Some("proxy".into()),
                ca_cert_path: None,
                insecure_skip_verify: true,
            }),
            ..EndpointConfig::default()
        };

        let addr: EndpointAddr = "10.0.0.1:19000".parse().unwrap();
        let derived = base.for_address(addr.clone());

        assert_eq!(derived.address, Some(addr));
        assert_eq!(EndpointConfig { address: None, ..derived }, base);
    }

    #[test]
    fn test_zero_timeouts_disable() {
        let config = EndpointConfig {
            read_timeout_ms: 0,
            write_timeout_ms: 250,
            idle_timeout_secs: 0,
            ..EndpointConfig::default()
        };
        assert_eq!(config.read_timeout(), None);
        assert_eq!(config.write_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.idle_timeout(), None);
    }

    #[test]
    fn test_minimal_toml() {
        let config: PoolConfig = toml::from_str(
            r#"
            [pool]
            endpoints = ["b:19000", "a:19000"]

            [client]
            transport = "tcp"
            db = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.pool.endpoints.len(), 2);
        assert_eq!(config.client.db, 1);
        assert_eq!(config.client.pool_size, 10);
        assert_eq!(config.client.address, None);
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.endpoint_addrs().unwrap()[1].as_str(), "a:19000");
    }
}
