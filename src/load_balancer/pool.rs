//! Proxy pool management.
//!
//! # Responsibilities
//! - Hold the active membership snapshot behind an `ArcSwap`
//! - Reconcile the snapshot against a new endpoint list with minimal churn
//! - Hand out members in round-robin order without locking
//! - Close every retired client exactly once

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

use crate::client::ClientFactory;
use crate::config::EndpointConfig;
use crate::load_balancer::{
    endpoint::{EndpointAddr, PooledClient},
    round_robin::RoundRobin,
    types::{PoolError, PoolResult, ReconcileReport},
};
use crate::observability::metrics;

/// Member of a pool snapshot.
pub type Member<C> = Arc<PooledClient<C>>;

/// Immutable, address-sorted view of the pool.
pub type Snapshot<C> = Arc<Vec<Member<C>>>;

/// Round-robin pool of endpoint clients.
///
/// `select` is lock-free and may be called from any number of threads.
/// `reconcile` and `shutdown` are administrative and expected to be driven by
/// one caller at a time; concurrent reconciles are not serialized.
pub struct ProxyPool<F: ClientFactory> {
    members: ArcSwap<Vec<Member<F::Client>>>,
    cursor: RoundRobin,
    base: EndpointConfig,
    factory: F,
}

impl<F: ClientFactory> ProxyPool<F> {
    /// Build a pool over `addresses`, creating one client per endpoint from
    /// `base` with the address substituted.
    pub fn new<I>(addresses: I, base: EndpointConfig, factory: F) -> PoolResult<Self>
    where
        I: IntoIterator<Item = EndpointAddr>,
    {
        let pool = Self {
            members: ArcSwap::from_pointee(Vec::new()),
            cursor: RoundRobin::new(),
            base: EndpointConfig { address: None, ..base },
            factory,
        };
        pool.reconcile(addresses)?;
        Ok(pool)
    }

    /// Replace the membership with `addresses`.
    ///
    /// Endpoints already in the pool keep their client. New endpoints get a
    /// client from the factory. The new snapshot is published before any
    /// removed client is closed, so no `select` that starts after this call
    /// returns can observe a retired member.
    ///
    /// If the factory fails for any endpoint, clients created by this call
    /// are closed again and the current membership stays in place.
    pub fn reconcile<I>(&self, addresses: I) -> PoolResult<ReconcileReport>
    where
        I: IntoIterator<Item = EndpointAddr>,
    {
        let mut desired: Vec<EndpointAddr> = addresses.into_iter().collect();
        desired.sort();
        desired.dedup();

        let current = self.members.load_full();
        let mut existing: HashMap<EndpointAddr, Member<F::Client>> = current
            .iter()
            .map(|member| (member.addr().clone(), Arc::clone(member)))
            .collect();

        let mut next = Vec::with_capacity(desired.len());
        let mut created = Vec::new();
        let mut report = ReconcileReport::default();

        for addr in desired {
            if let Some(member) = existing.remove(&addr) {
                next.push(member);
                report.retained.push(addr);
                continue;
            }

            match self.factory.create(&self.base.for_address(addr.clone())) {
                Ok(client) => {
                    let member = Arc::new(PooledClient::new(addr.clone(), client));
                    created.push(Arc::clone(&member));
                    next.push(member);
                    report.added.push(addr);
                }
                Err(source) => {
                    tracing::error!(addr = %addr, error = %source, "Failed to create endpoint client, membership unchanged");
                    for member in &created {
                        close_member(member, "rollback");
                    }
                    return Err(PoolError::Connect { addr, source });
                }
            }
        }

        let mut removed: Vec<Member<F::Client>> = existing.into_values().collect();
        removed.sort_by(|a, b| a.addr().cmp(b.addr()));

        let size = next.len();
        self.members.store(Arc::new(next));
        metrics::record_membership(size);

        for addr in &report.added {
            tracing::info!(addr = %addr, "Added proxy endpoint");
        }
        metrics::record_endpoints_added(report.added.len());

        for member in &removed {
            tracing::info!(addr = %member.addr(), "Removed proxy endpoint");
            close_member(member, "removed");
            report.removed.push(member.addr().clone());
        }
        metrics::record_endpoints_removed(report.removed.len());

        Ok(report)
    }

    /// Next member in round-robin order.
    pub fn select(&self) -> PoolResult<Member<F::Client>> {
        let members = self.members.load();
        match self.cursor.next_index(members.len()) {
            Some(index) => {
                metrics::record_selection();
                Ok(Arc::clone(&members[index]))
            }
            None => {
                metrics::record_empty_selection();
                tracing::debug!("Selection on empty proxy pool");
                Err(PoolError::Empty)
            }
        }
    }

    /// Take every member out of rotation and close its client.
    ///
    /// Close failures are logged and do not stop the remaining closes.
    /// Calling it again closes nothing; `select` reports `PoolError::Empty`
    /// afterwards.
    pub fn shutdown(&self) {
        let previous = self.members.swap(Arc::new(Vec::new()));
        metrics::record_membership(0);
        for member in previous.iter() {
            close_member(member, "shutdown");
        }
        tracing::info!(closed = previous.len(), "Proxy pool shut down");
    }

    /// The active snapshot.
    pub fn snapshot(&self) -> Snapshot<F::Client> {
        self.members.load_full()
    }

    /// Addresses of the active snapshot in canonical order.
    pub fn addresses(&self) -> Vec<EndpointAddr> {
        self.members.load().iter().map(|m| m.addr().clone()).collect()
    }

    /// Number of members in the active snapshot.
    pub fn len(&self) -> usize {
        self.members.load().len()
    }

    /// True when there is nothing to select, including after `shutdown`.
    pub fn is_empty(&self) -> bool {
        self.members.load().is_empty()
    }

    /// Base client config (address unset).
    pub fn base_config(&self) -> &EndpointConfig {
        &self.base
    }
}

impl<F: ClientFactory> std::fmt::Debug for ProxyPool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyPool")
            .field("members", &self.addresses())
            .finish()
    }
}

fn close_member<C: crate::client::EndpointClient>(member: &PooledClient<C>, reason: &'static str) {
    if let Err(e) = member.close() {
        metrics::record_close_error();
        tracing::warn!(addr = %member.addr(), reason, error = %e, "Failed to close endpoint client");
    }
}
