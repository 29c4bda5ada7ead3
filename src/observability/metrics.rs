//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define server metrics (requests, latency, faults, live channels)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `dashboard_requests_total` (counter): requests by method, status
//! - `dashboard_request_duration_seconds` (histogram): latency by method
//! - `dashboard_provider_faults_total` (counter): failed providers and sources
//! - `dashboard_merge_conflicts_total` (counter): dropped contributions
//! - `dashboard_published_total` (counter): live cache writes
//! - `dashboard_live_channels` (gauge): channels held in the live cache
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels for method, status code, provider

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Count a finished request and its latency.
pub fn record_request(method: &str, status: u16, started: Instant) {
    metrics::counter!(
        "dashboard_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("dashboard_request_duration_seconds", "method" => method.to_string())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_provider_fault(provider: &str) {
    metrics::counter!("dashboard_provider_faults_total", "provider" => provider.to_string())
        .increment(1);
}

pub fn record_merge_conflict() {
    metrics::counter!("dashboard_merge_conflicts_total").increment(1);
}

pub fn record_publish() {
    metrics::counter!("dashboard_published_total").increment(1);
}

pub fn record_live_channels(count: usize) {
    metrics::gauge!("dashboard_live_channels").set(count as f64);
}
