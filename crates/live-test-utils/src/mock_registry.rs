//! Mock session registry.
//!
//! A wiremock server mounted under `/api/live` with canned answers for the
//! lifecycle calls, plus request inspection for assertions.

use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const API_PREFIX: &str = "/api/live";

/// Wiremock-backed registry.
///
/// # Example
///
/// ```rust,ignore
/// let registry = MockRegistry::start().await;
/// registry.accept_start("abc123").await;
/// registry.accept_end().await;
///
/// // configure LIVE_API_URL = registry.url()
/// ```
pub struct MockRegistry {
    server: MockServer,
}

impl MockRegistry {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// URL to configure as `LIVE_API_URL`.
    pub fn url(&self) -> String {
        format!("{}{}", self.server.uri(), API_PREFIX)
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// `POST /start` answers with `stream_key`.
    pub async fn accept_start(&self, stream_key: &str) {
        Mock::given(method("POST"))
            .and(path(format!("{}/start", API_PREFIX)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "result": { "streamKey": stream_key } })),
            )
            .mount(&self.server)
            .await;
    }

    /// `POST /start` fails with `status`.
    pub async fn reject_start(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path(format!("{}/start", API_PREFIX)))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    pub async fn accept_end(&self) {
        Mock::given(method("POST"))
            .and(path(format!("{}/end", API_PREFIX)))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.server)
            .await;
    }

    /// `GET /enter/{key}` answers with a title and viewer count.
    pub async fn accept_enter(&self, title: &str, viewer_count: u64) {
        Mock::given(method("GET"))
            .and(path_regex(format!("^{}/enter/[^/]+$", API_PREFIX)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": { "title": title, "viewerCount": viewer_count }
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn accept_exit(&self) {
        Mock::given(method("POST"))
            .and(path(format!("{}/exit", API_PREFIX)))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.server)
            .await;
    }

    /// Requests received on `{prefix}/{endpoint}` with the given method.
    pub async fn requests_to(&self, http_method: &str, endpoint: &str) -> Vec<Request> {
        let expected_path = format!("{}/{}", API_PREFIX, endpoint);
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == http_method && r.url.path() == expected_path)
            .collect()
    }
}
