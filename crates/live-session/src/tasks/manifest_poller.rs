//! Manifest availability poller.
//!
//! The playback manifest appears asynchronously once transcoding has
//! started, with no published upper bound. The poller probes it with a GET
//! on a fixed cadence until the first success, then stops for good.
//!
//! # Graceful Shutdown
//!
//! The poller exits as soon as its cancellation token fires, including in the
//! middle of a probe or a retry wait.

use crate::errors::LiveError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Probes one manifest URL.
#[derive(Debug, Clone)]
pub struct ManifestPoller {
    client: reqwest::Client,
    url: String,
    retry_interval: Duration,
    probe_timeout: Duration,
}

impl ManifestPoller {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        retry_interval: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            retry_interval,
            probe_timeout,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one probe.
    ///
    /// # Errors
    ///
    /// Returns `LiveError::ManifestUnavailable` on a non-success status, a
    /// network error, or when the probe outlives its timeout.
    pub async fn probe(&self) -> Result<(), LiveError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| LiveError::ManifestUnavailable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(LiveError::ManifestUnavailable(format!(
                "HTTP {}",
                response.status().as_u16()
            )))
        }
    }

    /// Probe until the manifest answers.
    ///
    /// Returns the number of probes issued, or `None` if cancelled first.
    #[instrument(skip_all, name = "live.task.manifest_poller", fields(url = %self.url))]
    pub async fn wait_until_ready(&self, cancel_token: &CancellationToken) -> Option<u32> {
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);

            let outcome = tokio::select! {
                () = cancel_token.cancelled() => return None,
                outcome = self.probe() => outcome,
            };

            match outcome {
                Ok(()) => {
                    info!(
                        target: "live.task.manifest_poller",
                        attempts = attempts,
                        "Manifest available"
                    );
                    return Some(attempts);
                }
                Err(e) => {
                    debug!(
                        target: "live.task.manifest_poller",
                        attempt = attempts,
                        reason = %e,
                        "Manifest not ready, retrying"
                    );
                }
            }

            tokio::select! {
                () = cancel_token.cancelled() => return None,
                () = tokio::time::sleep(self.retry_interval) => {}
            }
        }
    }
}
