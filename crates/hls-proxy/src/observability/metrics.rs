//! Metrics definitions for the HLS proxy.
//!
//! All metrics follow Prometheus naming conventions:
//! - `hls_proxy_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP methods
//! - `endpoint`: `/hls/{path}`, `/health`, `/metrics`, `/other`
//! - `status`: success, error, timeout
//! - `outcome`: success, not_found, error

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used by
/// `/metrics`.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("hls_proxy_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Segments are larger than manifests; keep headroom up to the timeout.
        .set_buckets_for_metric(
            Matcher::Prefix("hls_proxy_upstream_request".to_string()),
            &[0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set upstream request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `hls_proxy_http_requests_total`, `hls_proxy_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("hls_proxy_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("hls_proxy_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

// ============================================================================
// Upstream Metrics
// ============================================================================

/// Record one request to the HLS origin
///
/// Metric: `hls_proxy_upstream_requests_total`, `hls_proxy_upstream_request_duration_seconds`
/// Labels: `outcome`
pub fn record_upstream_request(outcome: &'static str, duration: Duration) {
    histogram!("hls_proxy_upstream_request_duration_seconds",
        "outcome" => outcome
    )
    .record(duration.as_secs_f64());

    counter!("hls_proxy_upstream_requests_total",
        "outcome" => outcome
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Collapse playback paths into one label value.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/metrics" => "/metrics",
        p if p.starts_with("/hls/") => "/hls/{path}",
        _ => "/other",
    }
}
