//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, rule
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//!
//! # Design Decisions
//! - The `rule` label carries the matched rule name, or `"none"` when no
//!   rule matched; this is the per-request hook a surrounding metrics
//!   layer consumes
//! - Low-overhead updates through the metrics facade

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    if let Err(err) = builder.install() {
        tracing::error!(error = %err, "Failed to install metrics exporter");
        return;
    }

    describe_counter!(
        "gateway_requests_total",
        "Total requests by method, status and matched rule"
    );
    describe_histogram!(
        "gateway_request_duration_seconds",
        "Request latency by method, status and matched rule"
    );

    tracing::info!(address = %addr, "Metrics exporter listening");
}

/// Record one completed request: matched rule (or "none"), outbound
/// status, latency.
pub fn record_request(method: &str, status: u16, rule: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("rule", rule.to_string()),
    ];
    counter!("gateway_requests_total", &labels).increment(1);
    histogram!("gateway_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}
