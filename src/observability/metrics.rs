//! Metrics collection and exposition.
//!
//! # Metrics
//! - `onering_requests_total` (counter): requests by outcome and status
//! - `onering_request_duration_seconds` (histogram): end-to-end latency
//! - `onering_config_reloads_total` (counter): reloads by outcome
//! - `onering_routes` (gauge): entries in the live routing table
//! - `onering_listener_restarts_total` (counter): relaunches per listener
//!
//! Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a dispatched request. `outcome` is `forwarded`, `not_found` or
/// `upstream_error`.
pub fn record_request(outcome: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "onering_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("onering_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_reload(outcome: &'static str) {
    metrics::counter!("onering_config_reloads_total", "outcome" => outcome).increment(1);
}

pub fn set_routes(count: usize) {
    metrics::gauge!("onering_routes").set(count as f64);
}

pub fn record_listener_restart(listener: &'static str) {
    metrics::counter!("onering_listener_restarts_total", "listener" => listener).increment(1);
}
