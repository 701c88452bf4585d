//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, guard rejections)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_rate_limited_total` (counter): 429 responses
//! - `gateway_csrf_rejected_total` (counter): 403 responses by reason
//! - `gateway_csrf_tokens_issued_total` (counter): tokens minted
//! - `gateway_origin_rejected_total` (counter): cross-origin requests left without CORS headers
//! - `gateway_rate_limit_tracked_clients` (gauge): live rate-limit counters
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so library users
//!   and tests pay nothing
//! - Histogram buckets tuned for typical web latencies

use axum::{extract::Request, middleware::Next, response::Response};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

const REQUEST_DURATION: &str = "gateway_request_duration_seconds";
const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), DURATION_BUCKETS)?
        .with_http_listener(addr)
        .install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    ::metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    ::metrics::histogram!(
        REQUEST_DURATION,
        "method" => method.to_string(),
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

/// Middleware recording every response that leaves the pipeline.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let response = next.run(request).await;
    record_request(method.as_str(), response.status().as_u16(), start);
    response
}

pub fn record_rate_limited() {
    ::metrics::counter!("gateway_rate_limited_total").increment(1);
}

pub fn record_csrf_rejected(reason: &'static str) {
    ::metrics::counter!("gateway_csrf_rejected_total", "reason" => reason).increment(1);
}

pub fn record_csrf_issued() {
    ::metrics::counter!("gateway_csrf_tokens_issued_total").increment(1);
}

pub fn record_origin_rejected() {
    ::metrics::counter!("gateway_origin_rejected_total").increment(1);
}

pub fn record_tracked_clients(count: usize) {
    ::metrics::gauge!("gateway_rate_limit_tracked_clients").set(count as f64);
}
