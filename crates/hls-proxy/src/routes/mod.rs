//! HTTP routes for the HLS proxy.
//!
//! Defines the Axum router and application state.

use crate::config::ProxyConfig;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::OriginClient;
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use crate::observability::metrics::init_metrics_recorder;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,

    /// Client for the HLS origin.
    pub origin: OriginClient,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/hls/*path` - GET proxies to the origin, OPTIONS answers the preflight
/// - `/health` - Liveness probe
/// - `/metrics` - Prometheus metrics endpoint
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let proxy_routes = Router::new()
        .route(
            "/hls/*path",
            get(handlers::proxy_get).options(handlers::preflight),
        )
        .route("/health", get(handlers::health_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (the last `.layer` call wraps everything before it):
    // 1. TraceLayer - Log request details (innermost)
    // 2. TimeoutLayer - Timeout the traced request
    // 3. http_metrics_middleware - Record ALL responses, timeouts included (outermost)
    proxy_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
