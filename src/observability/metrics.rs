//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_pool_endpoints` (gauge): members in the active snapshot
//! - `proxy_pool_endpoints_added_total` (counter): clients created by reconcile
//! - `proxy_pool_endpoints_removed_total` (counter): clients retired by reconcile
//! - `proxy_pool_close_errors_total` (counter): failed client closes
//! - `proxy_pool_selections_total` (counter): successful selections
//! - `proxy_pool_empty_selections_total` (counter): selections on an empty pool
//! - `proxy_pool_requests_total` (counter): commands by endpoint and outcome

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus recorder and its HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_membership(size: usize) {
    ::metrics::gauge!("proxy_pool_endpoints").set(size as f64);
}

pub fn record_endpoints_added(count: usize) {
    ::metrics::counter!("proxy_pool_endpoints_added_total").increment(count as u64);
}

pub fn record_endpoints_removed(count: usize) {
    ::metrics::counter!("proxy_pool_endpoints_removed_total").increment(count as u64);
}

pub fn record_close_error() {
    ::metrics::counter!("proxy_pool_close_errors_total").increment(1);
}

pub fn record_selection() {
    ::metrics::counter!("proxy_pool_selections_total").increment(1);
}

pub fn record_empty_selection() {
    ::metrics::counter!("proxy_pool_empty_selections_total").increment(1);
}

pub fn record_request(endpoint: &str, outcome: &'static str) {
    ::metrics::counter!(
        "proxy_pool_requests_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
