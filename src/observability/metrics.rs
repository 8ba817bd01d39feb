//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fx_requests_total` (counter): requests by method, status
//! - `fx_request_duration_seconds` (histogram): latency distribution
//! - `fx_recovered_panics_total` (counter): handler panics turned into 500s
//! - `fx_request_timeouts_total` (counter): requests cut off by the deadline
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "fx_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("fx_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_recovered_panic() {
    metrics::counter!("fx_recovered_panics_total").increment(1);
}

pub fn record_timeout() {
    metrics::counter!("fx_request_timeouts_total").increment(1);
}

/// Router middleware recording status and latency for every routed request.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    record_request(&method, response.status().as_u16(), start);
    response
}
