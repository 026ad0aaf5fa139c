//! Prometheus metrics endpoint
//!
//! Exposes application metrics in Prometheus format for monitoring.

use std::time::Instant;

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    // Force initialization of the lazy static
    let _ = &*PROMETHEUS_HANDLE;

    // Register custom metrics
    register_metrics();
}

/// Register all custom metrics
fn register_metrics() {
    // These metrics are registered by usage, but we can describe them here
    metrics::describe_counter!(
        "gateway_requests_total",
        "Total number of requests processed"
    );
    metrics::describe_counter!(
        "gateway_upstream_attempts_total",
        "Total upstream request attempts"
    );
    metrics::describe_counter!(
        "gateway_rate_limited_total",
        "Total requests rejected by rate limiting"
    );
    metrics::describe_counter!(
        "gateway_signature_failures_total",
        "Total requests rejected for a missing or invalid signature"
    );
    metrics::describe_histogram!(
        "gateway_request_duration_seconds",
        "Request duration in seconds"
    );
}

/// Prometheus metrics endpoint handler
///
/// Returns metrics in Prometheus text format for scraping.
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a completed request
pub fn record_request(route: &str, status: u16, duration_secs: f64) {
    metrics::counter!("gateway_requests_total", "route" => route.to_string(), "status" => status.to_string())
        .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(duration_secs);
}

/// Request tracking middleware
///
/// Counts every response, whatever its status: rejections from the rate
/// limiter and signature check land here just like handler successes. The
/// route set is fixed, so the raw path is safe as a label.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let route = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    record_request(
        &route,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

/// Record the outcome of a single upstream attempt
pub fn record_upstream_attempt(provider: &str, outcome: &str) {
    metrics::counter!(
        "gateway_upstream_attempts_total",
        "provider" => provider.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a request rejected by rate limiting
pub fn record_rate_limited(group: &str) {
    metrics::counter!("gateway_rate_limited_total", "group" => group.to_string()).increment(1);
}

/// Record a request rejected by signature verification
pub fn record_signature_failure() {
    metrics::counter!("gateway_signature_failures_total").increment(1);
}
