//! Session registry HTTP client.
//!
//! Talks to the backend that issues stream keys, counts viewers and fans out
//! end-of-stream notifications. Every call carries the caller's credential
//! in the role header; wrong-role calls are rejected locally before any
//! request is made.

use super::models::{
    Envelope, EnterResponse, LiveListQuery, LivePage, StartRequest, StartResponse,
};
use super::SessionRegistry;
use crate::errors::LiveError;
use async_trait::async_trait;
use common::{Credential, LifecycleEvent, StreamKey};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{error, instrument, warn};

/// Connect timeout for registry requests in seconds.
const REGISTRY_CONNECT_TIMEOUT_SECS: u64 = 5;

/// HTTP implementation of [`SessionRegistry`].
#[derive(Clone)]
pub struct HttpSessionRegistry {
    /// HTTP client with configured timeouts.
    client: Client,

    /// Base URL of the registry API (e.g. "http://localhost:8080/api/live").
    base_url: String,
}

impl HttpSessionRegistry {
    /// Create a new registry client.
    ///
    /// # Errors
    ///
    /// Returns `LiveError::Internal` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LiveError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(REGISTRY_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                error!(target: "live.registry", error = %e, "Failed to build HTTP client");
                LiveError::Internal("failed to build registry client".to_string())
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are made against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoint reporting `event`.
    fn endpoint(&self, event: LifecycleEvent) -> String {
        format!("{}/{}", self.base_url, event.action())
    }

    async fn read_result<T: DeserializeOwned>(
        response: Response,
        fail: fn(String) -> LiveError,
    ) -> Result<T, LiveError> {
        let status = response.status();
        if !status.is_success() {
            warn!(target: "live.registry", status = %status, "Registry rejected request");
            return Err(fail(format!("registry returned {}", status)));
        }

        response
            .json::<Envelope<T>>()
            .await
            .map(|envelope| envelope.result)
            .map_err(|e| {
                error!(target: "live.registry", error = %e, "Failed to parse registry response");
                fail("malformed registry response".to_string())
            })
    }

    fn check_status(response: &Response, fail: fn(String) -> LiveError) -> Result<(), LiveError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            warn!(target: "live.registry", status = %status, "Registry rejected request");
            Err(fail(format!("registry returned {}", status)))
        }
    }
}

fn unreachable_as(fail: fn(String) -> LiveError) -> impl FnOnce(reqwest::Error) -> LiveError {
    move |e| {
        warn!(target: "live.registry", error = %e, "Registry request failed");
        fail("registry is unreachable".to_string())
    }
}

#[async_trait]
impl SessionRegistry for HttpSessionRegistry {
    #[instrument(skip_all, name = "live.registry.start", fields(title = %request.title))]
    async fn start(
        &self,
        credential: &Credential,
        request: &StartRequest,
    ) -> Result<StreamKey, LiveError> {
        credential.authorize(LifecycleEvent::Started)?;

        let response = self
            .client
            .post(self.endpoint(LifecycleEvent::Started))
            .header(credential.header_name(), &credential.principal_id)
            .json(request)
            .send()
            .await
            .map_err(unreachable_as(LiveError::StartFailed))?;

        let started: StartResponse = Self::read_result(response, LiveError::StartFailed).await?;
        Ok(started.stream_key)
    }

    #[instrument(skip_all, name = "live.registry.end", fields(stream_key = %stream_key))]
    async fn end(&self, credential: &Credential, stream_key: &StreamKey) -> Result<(), LiveError> {
        credential.authorize(LifecycleEvent::Ended)?;

        let response = self
            .client
            .post(self.endpoint(LifecycleEvent::Ended))
            .query(&[("streamKey", stream_key.as_str())])
            .header(credential.header_name(), &credential.principal_id)
            .send()
            .await
            .map_err(unreachable_as(LiveError::EndFailed))?;

        Self::check_status(&response, LiveError::EndFailed)
    }

    #[instrument(skip_all, name = "live.registry.enter", fields(stream_key = %stream_key))]
    async fn enter(
        &self,
        credential: &Credential,
        stream_key: &StreamKey,
    ) -> Result<EnterResponse, LiveError> {
        credential.authorize(LifecycleEvent::ViewerEntered)?;

        let response = self
            .client
            .get(format!(
                "{}/{}",
                self.endpoint(LifecycleEvent::ViewerEntered),
                stream_key
            ))
            .header(credential.header_name(), &credential.principal_id)
            .send()
            .await
            .map_err(unreachable_as(LiveError::Registry))?;

        Self::read_result(response, LiveError::Registry).await
    }

    #[instrument(skip_all, name = "live.registry.exit", fields(stream_key = %stream_key))]
    async fn exit(&self, credential: &Credential, stream_key: &StreamKey) -> Result<(), LiveError> {
        credential.authorize(LifecycleEvent::ViewerExited)?;

        let response = self
            .client
            .post(self.endpoint(LifecycleEvent::ViewerExited))
            .query(&[("streamKey", stream_key.as_str())])
            .header(credential.header_name(), &credential.principal_id)
            .send()
            .await
            .map_err(unreachable_as(LiveError::Registry))?;

        Self::check_status(&response, LiveError::Registry)
    }

    #[instrument(skip_all, name = "live.registry.list", fields(size = query.size))]
    async fn list(&self, query: &LiveListQuery) -> Result<LivePage, LiveError> {
        let mut params: Vec<(&str, String)> = vec![("size", query.size.to_string())];
        if let Some(cursor) = &query.cursor {
            params.push(("cursor", cursor.clone()));
        }
        if let Some(category_id) = query
            .category_id
            .filter(|id| *id != crate::config::DEFAULT_CATEGORY_ID)
        {
            params.push(("categoryId", category_id.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/all", self.base_url))
            .query(&params)
            .send()
            .await
            .map_err(unreachable_as(LiveError::Registry))?;

        Self::read_result(response, LiveError::Registry).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let registry =
            HttpSessionRegistry::new("http://api.local/live/", Duration::from_secs(1)).unwrap();
        assert_eq!(registry.base_url(), "http://api.local/live");
    }

    #[tokio::test]
    async fn test_start_with_viewer_credential_fails_locally() {
        // Port 9 (discard) is never contacted: the role check runs first.
        let registry =
            HttpSessionRegistry::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let request = StartRequest {
            title: "demo".to_string(),
            category_id: 1,
        };

        let result = registry
            .start(&Credential::viewer("user-456"), &request)
            .await;
        assert!(matches!(result, Err(LiveError::Validation(msg)) if msg.contains("broadcaster")));
    }

    #[tokio::test]
    async fn test_exit_with_broadcaster_credential_fails_locally() {
        let registry =
            HttpSessionRegistry::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let key = StreamKey::new("abc123").unwrap();

        let result = registry
            .exit(&Credential::broadcaster("busker-123"), &key)
            .await;
        assert!(matches!(result, Err(LiveError::Validation(_))));
    }
}
