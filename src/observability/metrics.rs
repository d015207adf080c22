//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dev_lazy_activations_total` (counter): activations by kind (new, shared, resumed)
//! - `dev_lazy_evictions_total` (counter): modules dropped after the unused timeout
//! - `dev_lazy_active_modules` (gauge): entries in the activation registry
//! - `dev_lazy_open_connections` (gauge): live client connections
//! - `dev_lazy_rejected_batches_total` (counter): malformed request paths
//! - `dev_lazy_invalidations_total` (counter): rebuilds requested from the host

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_activation(kind: &'static str) {
    counter!("dev_lazy_activations_total", "kind" => kind).increment(1);
}

pub fn record_eviction() {
    counter!("dev_lazy_evictions_total").increment(1);
}

pub fn record_active_modules(count: usize) {
    gauge!("dev_lazy_active_modules").set(count as f64);
}

pub fn record_open_connections(count: u64) {
    gauge!("dev_lazy_open_connections").set(count as f64);
}

pub fn record_rejected_batch() {
    counter!("dev_lazy_rejected_batches_total").increment(1);
}

pub fn record_invalidation() {
    counter!("dev_lazy_invalidations_total").increment(1);
}
