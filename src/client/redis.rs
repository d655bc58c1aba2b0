//! RESP endpoint client.
//!
//! # Responsibilities
//! - Implement `EndpointClient` for Redis-protocol proxies
//! - Keep a bounded set of reusable connections per endpoint
//! - Retry transient network failures with backoff
//! - Release every connection on `close`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::client::connection::RespConnection;
use crate::client::resp::{Command, Reply};
use crate::client::{ClientError, ClientFactory, ClientResult, EndpointClient};
use crate::config::{EndpointConfig, Transport, MAX_POOL_SIZE};
use crate::observability::metrics;
use crate::resilience::retries::RetryPolicy;

/// Client for one Redis-protocol endpoint.
///
/// Connections are dialed lazily and returned to an idle list after each
/// successful round trip. At most `pool_size` commands are in flight at once;
/// further callers wait up to `pool_timeout` for a slot.
#[derive(Debug)]
pub struct RespClient {
    config: EndpointConfig,
    endpoint: String,
    retry: RetryPolicy,
    idle: Mutex<Vec<RespConnection>>,
    slots: Semaphore,
    closed: AtomicBool,
}

impl RespClient {
    fn new(config: EndpointConfig) -> Self {
        let endpoint = config
            .address
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        Self {
            retry: RetryPolicy::from_config(&config),
            slots: Semaphore::new(config.pool_size),
            idle: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            endpoint,
            config,
        }
    }

    /// Settings this client was built with.
    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Number of idle connections kept for reuse.
    pub fn idle_connections(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn attempt(&self, command: &Command) -> ClientResult<Reply> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }

        let _slot = timeout(self.config.pool_timeout(), self.slots.acquire())
            .await
            .map_err(|_| ClientError::PoolTimeout)?
            .map_err(|_| ClientError::Closed)?;

        let mut conn = match self.checkout() {
            Some(conn) => conn,
            None => RespConnection::dial(&self.config).await?,
        };

        // A connection that failed mid round trip is dropped, not reused.
        let reply = conn.round_trip(command).await?;
        self.checkin(conn);

        match reply {
            Reply::Error(msg) => Err(ClientError::Server(msg)),
            reply => Ok(reply),
        }
    }

    fn checkout(&self) -> Option<RespConnection> {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(conn) = idle.pop() {
            match self.config.idle_timeout() {
                Some(limit) if conn.idle_for() > limit => {
                    tracing::debug!(endpoint = %self.endpoint, "Dropping stale idle connection");
                }
                _ => return Some(conn),
            }
        }
        None
    }

    fn checkin(&self, conn: RespConnection) {
        if self.is_closed() {
            return;
        }
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.config.pool_size {
            idle.push(conn);
        }
    }
}

impl EndpointClient for RespClient {
    async fn issue(&self, command: Command) -> ClientResult<Reply> {
        let mut retry = 0;
        loop {
            let err = match self.attempt(&command).await {
                Ok(reply) => {
                    metrics::record_request(&self.endpoint, "ok");
                    return Ok(reply);
                }
                Err(err) => err,
            };

            retry += 1;
            match self.retry.next_delay(retry, &err) {
                Some(delay) => {
                    tracing::debug!(
                        endpoint = %self.endpoint,
                        command = %command.name(),
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying command"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    let outcome = if matches!(err, ClientError::Server(_)) { "server_error" } else { "error" };
                    metrics::record_request(&self.endpoint, outcome);
                    return Err(err);
                }
            }
        }
    }

    fn close(&self) -> ClientResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(ClientError::Closed);
        }
        self.slots.close();
        let dropped = {
            let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *idle).len()
        };
        tracing::debug!(endpoint = %self.endpoint, dropped, "Client closed");
        Ok(())
    }
}

/// Factory producing [`RespClient`]s.
///
/// Building a client does no I/O, so a reconcile never waits on the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct RespClientFactory;

impl ClientFactory for RespClientFactory {
    type Client = RespClient;

    fn create(&self, config: &EndpointConfig) -> ClientResult<RespClient> {
        let addr = config
            .address
            .as_ref()
            .ok_or_else(|| ClientError::InvalidConfig("endpoint address is not set".into()))?;

        if config.tls.is_some() {
            return Err(ClientError::InvalidConfig("TLS is not supported by the RESP client".into()));
        }
        if config.pool_size == 0 || config.pool_size > MAX_POOL_SIZE {
            return Err(ClientError::InvalidConfig(format!(
                "pool_size must be between 1 and {MAX_POOL_SIZE}, got {}",
                config.pool_size
            )));
        }
        match config.transport {
            Transport::Unix if !addr.is_unix_path() => {
                return Err(ClientError::InvalidConfig(format!(
                    "unix transport needs an absolute socket path, got {addr}"
                )));
            }
            Transport::Tcp if addr.is_unix_path() => {
                return Err(ClientError::InvalidConfig(format!(
                    "tcp transport needs host:port, got {addr}"
                )));
            }
            _ => {}
        }

        Ok(RespClient::new(config.clone()))
    }
}
