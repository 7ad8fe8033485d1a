//! HLS proxy error types.
//!
//! Upstream failures are never retried. Clients only ever see the two fixed
//! bodies below; the cause is logged server-side.

use crate::cors;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Body returned when the origin answered with a non-success status.
pub const NOT_FOUND_BODY: &str = "Stream not found";

/// Body returned on transport failures and internal errors.
pub const INTERNAL_ERROR_BODY: &str = "Internal Server Error";

/// HLS proxy error type.
///
/// Maps to HTTP status codes:
/// - UpstreamStatus: 404 Not Found
/// - UpstreamTransport, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The origin answered, but not with success.
    #[error("Upstream returned status {0}")]
    UpstreamStatus(u16),

    /// The origin could not be reached or the body could not be read.
    #[error("Upstream transport error: {0}")]
    UpstreamTransport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::UpstreamStatus(_) => StatusCode::NOT_FOUND,
            ProxyError::UpstreamTransport(_) | ProxyError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = match &self {
            ProxyError::UpstreamStatus(status) => {
                tracing::debug!(target: "hls_proxy.upstream", status = status, "Upstream miss");
                NOT_FOUND_BODY
            }
            ProxyError::UpstreamTransport(reason) => {
                tracing::error!(target: "hls_proxy.upstream", error = %reason, "Upstream request failed");
                INTERNAL_ERROR_BODY
            }
            ProxyError::Internal(reason) => {
                tracing::error!(target: "hls_proxy.handler", error = %reason, "Internal error");
                INTERNAL_ERROR_BODY
            }
        };

        let mut response = (self.status_code(), body).into_response();
        cors::apply(response.headers_mut());
        response
    }
}
