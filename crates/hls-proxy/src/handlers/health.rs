//! Liveness handler.

use axum::Json;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Handler for GET /health
///
/// The proxy holds no state worth probing; reaching the handler is the check.
#[tracing::instrument(skip_all, name = "hls_proxy.health.check")]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}
