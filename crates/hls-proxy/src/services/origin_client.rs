//! HLS origin client.
//!
//! Upstream URLs are the configured origin base joined with the request path,
//! with no other normalization. `https://` origins are usually self-signed, so
//! the secure client skips certificate verification; plain origins use a
//! standard client.

use crate::errors::ProxyError;
use crate::observability::metrics::record_upstream_request;
use bytes::Bytes;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Content type used when the origin does not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// Connect timeout for both clients.
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// A successful upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub content_type: String,
    pub body: Bytes,
}

/// Client for the HLS origin.
#[derive(Debug, Clone)]
pub struct OriginClient {
    base_url: String,
    secure: reqwest::Client,
    plain: reqwest::Client,
}

impl OriginClient {
    /// Build both clients.
    ///
    /// # Errors
    ///
    /// Returns `ProxyError::Internal` if a client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProxyError> {
        let secure = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| ProxyError::Internal(format!("failed to build secure client: {e}")))?;

        let plain = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProxyError::Internal(format!("failed to build plain client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secure,
            plain,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upstream URL for a playback-relative path.
    #[must_use]
    pub fn upstream_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn client_for(&self, url: &str) -> &reqwest::Client {
        if url.starts_with("https://") {
            &self.secure
        } else {
            &self.plain
        }
    }

    /// Fetch one manifest or segment.
    ///
    /// # Errors
    ///
    /// - `ProxyError::UpstreamStatus` when the origin answers non-success
    /// - `ProxyError::UpstreamTransport` when it cannot be reached or the body
    ///   cannot be read
    #[instrument(skip_all, name = "hls_proxy.upstream.fetch", fields(path = %path))]
    pub async fn fetch(&self, path: &str) -> Result<UpstreamResponse, ProxyError> {
        let url = self.upstream_url(path);
        let start = Instant::now();

        let result = self.fetch_url(&url).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(ProxyError::UpstreamStatus(_)) => "not_found",
            Err(_) => "error",
        };
        record_upstream_request(outcome, start.elapsed());

        result
    }

    async fn fetch_url(&self, url: &str) -> Result<UpstreamResponse, ProxyError> {
        let response = self
            .client_for(url)
            .get(url)
            .send()
            .await
            .map_err(|e| ProxyError::UpstreamTransport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            debug!(
                target: "hls_proxy.upstream",
                status = status.as_u16(),
                "Origin answered non-success"
            );
            return Err(ProxyError::UpstreamStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map_or_else(|| DEFAULT_CONTENT_TYPE.to_string(), str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::UpstreamTransport(format!("failed to read body: {e}")))?;

        Ok(UpstreamResponse { content_type, body })
    }
}
