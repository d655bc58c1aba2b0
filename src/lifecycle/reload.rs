//! Applying configuration updates to a running pool.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::client::ClientFactory;
use crate::config::PoolConfig;
use crate::load_balancer::{AddrParseError, PoolError, ProxyPool, ReconcileReport};

/// Why an update was not applied.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error(transparent)]
    Address(#[from] AddrParseError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Reconcile `pool` against the endpoints of `config`.
pub fn apply_update<F: ClientFactory>(
    pool: &ProxyPool<F>,
    config: &PoolConfig,
) -> Result<ReconcileReport, ReloadError> {
    if config.client != *pool.base_config() {
        tracing::warn!("Client settings changed; they take effect after a restart");
    }

    let addresses = config.endpoint_addrs()?;
    let report = pool.reconcile(addresses)?;

    if report.is_unchanged() {
        tracing::debug!(endpoints = pool.len(), "Membership unchanged");
    } else {
        tracing::info!(
            added = report.added.len(),
            removed = report.removed.len(),
            retained = report.retained.len(),
            "Membership reconciled"
        );
    }
    Ok(report)
}

/// Apply updates until the channel closes or shutdown is signalled.
///
/// A failed update is logged and the previous membership stays active.
pub async fn run_reload_loop<F: ClientFactory>(
    pool: Arc<ProxyPool<F>>,
    mut updates: mpsc::UnboundedReceiver<PoolConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(config) => {
                    if let Err(e) = apply_update(&pool, &config) {
                        tracing::error!(error = %e, "Failed to apply config update");
                    }
                }
                None => {
                    tracing::info!("Config updates closed, reload loop exiting");
                    break;
                }
            },
            _ = shutdown.recv() => {
                tracing::info!("Reload loop received shutdown signal, exiting");
                break;
            }
        }
    }
}
