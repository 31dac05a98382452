//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_requests_total` (counter): client requests by outcome and status
//! - `lb_request_duration_seconds` (histogram): time to answer a client
//! - `lb_forward_attempts_total` (counter): forwarding attempts by backend and result
//! - `lb_backend_sample_ns` (gauge): latest published sample per backend, NaN while unavailable
//! - `lb_backend_available` (gauge): 1=available, 0=unknown or unavailable
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::load_balancer::Latency;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished client request.
pub fn record_request(outcome: &'static str, status: u16, started: Instant) {
    counter!("lb_requests_total", "outcome" => outcome, "status" => status.to_string()).increment(1);
    histogram!("lb_request_duration_seconds", "outcome" => outcome)
        .record(started.elapsed().as_secs_f64());
}

/// Record one forwarding attempt against a backend.
pub fn record_attempt(backend: &str, result: &'static str) {
    counter!("lb_forward_attempts_total", "backend" => backend.to_string(), "result" => result)
        .increment(1);
}

/// Record the sample a health poller just published.
pub fn record_backend_sample(backend: &str, latency: Latency) {
    let backend = backend.to_string();
    gauge!("lb_backend_available", "backend" => backend.clone())
        .set(if latency.is_available() { 1.0 } else { 0.0 });
    let sample = latency.nanos().map(|n| n as f64).unwrap_or(f64::NAN);
    gauge!("lb_backend_sample_ns", "backend" => backend).set(sample);
}
