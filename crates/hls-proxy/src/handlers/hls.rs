//! Playback proxy handlers.
//!
//! `GET /hls/*path` forwards the origin's bytes untouched. `OPTIONS
//! /hls/*path` answers the CORS preflight without contacting the origin.

use crate::cors;
use crate::errors::ProxyError;
use crate::routes::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /hls/*path
///
/// The path is forwarded exactly as it arrived, percent-encoding included.
/// The query string is not forwarded.
///
/// # Response
///
/// - 200 with the origin's body and content type
///   (`application/vnd.apple.mpegurl` when the origin omits it)
/// - 404 `Stream not found` when the origin answers non-success
/// - 500 `Internal Server Error` when the origin cannot be reached
#[instrument(skip_all, name = "hls_proxy.handler.get", fields(path = %uri.path()))]
pub async fn proxy_get(
    State(state): State<Arc<AppState>>,
    uri: Uri,
) -> Result<Response, ProxyError> {
    let path = relative_path(&uri)?;
    let upstream = state.origin.fetch(path).await?;

    let content_type = HeaderValue::from_str(&upstream.content_type)
        .map_err(|e| ProxyError::Internal(format!("invalid upstream content type: {e}")))?;

    let mut response = (StatusCode::OK, Body::from(upstream.body)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    cors::apply(headers);

    Ok(response)
}

/// Raw request path below `/hls/`, still percent-encoded.
fn relative_path(uri: &Uri) -> Result<&str, ProxyError> {
    uri.path()
        .strip_prefix("/hls/")
        .ok_or_else(|| ProxyError::Internal(format!("unexpected proxy path: {}", uri.path())))
}

/// Handler for OPTIONS /hls/*path
///
/// Always 200 with an empty body and the CORS headers.
#[instrument(skip_all, name = "hls_proxy.handler.preflight")]
pub async fn preflight() -> Response {
    let mut response = StatusCode::OK.into_response();
    cors::apply(response.headers_mut());
    response
}
