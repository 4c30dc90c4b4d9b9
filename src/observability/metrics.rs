//! Metrics collection and exposition.
//!
//! # Metrics
//! - `api_client_requests_total` (counter): finished requests by method, status
//! - `api_client_request_duration_seconds` (histogram): latency incl. retries
//! - `api_client_retries_total` (counter): retries by reason
//! - `api_client_csrf_refresh_total` (counter): token recoveries by outcome

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::http::Method;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished logical request. `status` is 0 for network failures.
pub fn record_request(method: Method, status: u16, started: Instant) {
    ::metrics::counter!(
        "api_client_requests_total",
        "method" => method.as_str(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("api_client_request_duration_seconds", "method" => method.as_str())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_retry(reason: &'static str) {
    ::metrics::counter!("api_client_retries_total", "reason" => reason).increment(1);
}

pub fn record_csrf_refresh(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    ::metrics::counter!("api_client_csrf_refresh_total", "outcome" => outcome).increment(1);
}
