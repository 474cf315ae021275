//! Metrics collection and exposition.
//!
//! # Metrics
//! - `selector_selections_total` (counter): successful picks by strategy
//! - `selector_empty_selections_total` (counter): picks against an empty set
//! - `selector_updates_total` (counter): applied server snapshots
//! - `selector_servers` (gauge): current candidate count

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics endpoint started");
    Ok(())
}

pub fn record_selection(strategy: &'static str) {
    ::metrics::counter!("selector_selections_total", "strategy" => strategy).increment(1);
}

pub fn record_empty_selection(strategy: &'static str) {
    ::metrics::counter!("selector_empty_selections_total", "strategy" => strategy).increment(1);
}

pub fn record_update(strategy: &'static str) {
    ::metrics::counter!("selector_updates_total", "strategy" => strategy).increment(1);
}

pub fn record_server_count(strategy: &'static str, count: usize) {
    ::metrics::gauge!("selector_servers", "strategy" => strategy).set(count as f64);
}
