//! Round-robin client pool for Redis-protocol proxy tiers.
//!
//! A [`ProxyPool`] keeps one client per proxy endpoint, hands them out in
//! round-robin order without locking, and reconciles its membership against a
//! new endpoint list while reusing the clients of endpoints that stay.

pub mod client;
pub mod config;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;

pub use client::{ClientError, ClientFactory, Command, EndpointClient, Reply, RespClient, RespClientFactory};
pub use config::{EndpointConfig, PoolConfig};
pub use load_balancer::{EndpointAddr, PoolError, ProxyPool, ReconcileReport};
