//! `IngestSession` - broadcaster side of a live session.
//!
//! Owns the capture device, one ingest socket (through its [`ChunkQueue`])
//! and the stream-key lifecycle:
//!
//! ```text
//! Idle -> Requesting -> Active -> Ending -> Ended
//!            |
//!            +-> Idle (start failed)
//! ```
//!
//! `Ended` is absorbing. The socket is always closed on the way into
//! `Ended`, even if the end call never resolves.

use super::phases::{IngestEvent, IngestPhase};
use crate::actors::{ChunkQueue, ChunkQueueConfig, ChunkQueueHandle, QueueStatus};
use crate::config::LiveConfig;
use crate::devices::CaptureDevice;
use crate::errors::LiveError;
use crate::registry::{SessionRegistry, StartRequest};
use crate::transport::SocketConnector;
use common::{Credential, LifecycleEvent, MediaChunk, StreamKey};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Broadcaster session.
pub struct IngestSession {
    credential: Credential,
    registry: Arc<dyn SessionRegistry>,
    connector: Arc<dyn SocketConnector>,
    capture: Box<dyn CaptureDevice>,
    config: LiveConfig,
    phase: IngestPhase,
    stream_key: Option<StreamKey>,
    queue: Option<ChunkQueueHandle>,
    queue_task: Option<JoinHandle<()>>,
}

impl IngestSession {
    #[must_use]
    pub fn new(
        credential: Credential,
        registry: Arc<dyn SessionRegistry>,
        connector: Arc<dyn SocketConnector>,
        capture: Box<dyn CaptureDevice>,
        config: LiveConfig,
    ) -> Self {
        Self {
            credential,
            registry,
            connector,
            capture,
            config,
            phase: IngestPhase::Idle,
            stream_key: None,
            queue: None,
            queue_task: None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> IngestPhase {
        self.phase
    }

    /// Key issued by the registry. Retained after the session ends so the
    /// host view can be opened on the same stream.
    #[must_use]
    pub fn stream_key(&self) -> Option<&StreamKey> {
        self.stream_key.as_ref()
    }

    /// Drain status of the ingest queue, if one was ever started.
    #[must_use]
    pub fn queue_status(&self) -> Option<QueueStatus> {
        self.queue.as_ref().map(ChunkQueueHandle::status)
    }

    /// Handle to the ingest queue, for counters and status watches.
    #[must_use]
    pub fn queue(&self) -> Option<&ChunkQueueHandle> {
        self.queue.as_ref()
    }

    fn transition(&mut self, event: IngestEvent) -> Result<(), LiveError> {
        let next = self.phase.on(event)?;
        debug!(
            target: "live.ingest",
            from = self.phase.as_str(),
            to = next.as_str(),
            event = event.as_str(),
            "Ingest phase transition"
        );
        self.phase = next;
        Ok(())
    }

    /// Start broadcasting.
    ///
    /// Validation happens before anything is sent: an empty title or a
    /// non-broadcaster credential never reaches the registry.
    ///
    /// # Errors
    ///
    /// - `LiveError::Validation` for an empty title or unusable credential
    /// - `LiveError::InvalidTransition` unless the session is `Idle`
    /// - `LiveError::StartFailed` if the registry rejected the call, the
    ///   ingest socket could not be opened, or the preview could not attach;
    ///   the session is back in `Idle`
    #[instrument(skip_all, name = "live.ingest.start", fields(category_id = category_id))]
    pub async fn start(&mut self, title: &str, category_id: i64) -> Result<StreamKey, LiveError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(LiveError::Validation("title is required".to_string()));
        }
        self.credential.authorize(LifecycleEvent::Started)?;

        self.transition(IngestEvent::StartRequested)?;

        let request = StartRequest {
            title: title.to_string(),
            category_id,
        };
        let stream_key = match self.registry.start(&self.credential, &request).await {
            Ok(key) => key,
            Err(e) => return Err(self.fail_start(e)),
        };

        let mut sink = match self
            .connector
            .connect_ingest(&stream_key, &self.credential)
            .await
        {
            Ok(sink) => sink,
            Err(e) => {
                return Err(self.fail_start(LiveError::StartFailed(format!(
                    "ingest socket failed to open: {e}"
                ))))
            }
        };

        // The preview must be live before the first chunk can be produced.
        if let Err(e) = self.capture.attach_preview() {
            sink.close().await;
            return Err(self.fail_start(LiveError::StartFailed(format!(
                "capture preview failed: {e}"
            ))));
        }

        let (handle, task) = ChunkQueue::spawn(
            stream_key.clone(),
            sink,
            ChunkQueueConfig {
                capacity: self.config.chunk_queue_capacity,
                send_interval: self.config.chunk_send_interval,
            },
            CancellationToken::new(),
        );
        self.queue = Some(handle);
        self.queue_task = Some(task);
        self.stream_key = Some(stream_key.clone());
        self.transition(IngestEvent::StartSucceeded)?;

        info!(
            target: "live.ingest",
            stream_key = %stream_key,
            title = %title,
            "Broadcast started"
        );

        Ok(stream_key)
    }

    fn fail_start(&mut self, err: LiveError) -> LiveError {
        warn!(target: "live.ingest", error = %err, "Broadcast start failed");
        if let Err(e) = self.transition(IngestEvent::StartFailed) {
            error!(target: "live.ingest", error = %e, "Start failure from unexpected phase");
        }
        match err {
            LiveError::StartFailed(_) | LiveError::Validation(_) => err,
            other => LiveError::StartFailed(other.to_string()),
        }
    }

    /// Hand one captured chunk to the ingest queue. Never waits.
    ///
    /// Chunks arriving outside `Active`, empty chunks, and chunks arriving
    /// after the queue closed are dropped silently.
    ///
    /// # Errors
    ///
    /// - `LiveError::TransportLost` once the ingest socket has failed
    /// - `LiveError::QueueFull` if the producer outpaces the drain loop
    pub fn push_chunk(&self, chunk: MediaChunk) -> Result<(), LiveError> {
        if self.phase != IngestPhase::Active || chunk.is_empty() {
            return Ok(());
        }
        let Some(queue) = &self.queue else {
            return Ok(());
        };

        match queue.status() {
            QueueStatus::Draining => queue.enqueue(chunk),
            QueueStatus::TransportLost(reason) => Err(LiveError::TransportLost(reason)),
            QueueStatus::Closed => Ok(()),
        }
    }

    /// Stop broadcasting.
    ///
    /// Releases the capture device, issues the end call bounded by
    /// `end_call_timeout`, then closes the socket. The session reaches
    /// `Ended` whatever the end call's outcome. Stopping an ended session
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// - `LiveError::InvalidTransition` if the session never became active
    /// - `LiveError::EndFailed` if the end call failed or timed out; the
    ///   session is `Ended` regardless
    #[instrument(skip_all, name = "live.ingest.stop")]
    pub async fn stop(&mut self) -> Result<(), LiveError> {
        if self.phase == IngestPhase::Ended {
            return Ok(());
        }
        self.transition(IngestEvent::StopRequested)?;

        self.capture.release();

        let end_result = match self.stream_key.clone() {
            Some(key) => {
                let end_call = self.registry.end(&self.credential, &key);
                match tokio::time::timeout(self.config.end_call_timeout, end_call).await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(LiveError::EndFailed(e.to_string())),
                    Err(_) => Err(LiveError::EndFailed(format!(
                        "end call timed out after {}s",
                        self.config.end_call_timeout.as_secs()
                    ))),
                }
            }
            None => Ok(()),
        };

        if let Err(e) = &end_result {
            warn!(target: "live.ingest", error = %e, "End call failed, ending locally");
        }

        self.shutdown_queue().await;
        self.transition(IngestEvent::EndCompleted)?;

        info!(
            target: "live.ingest",
            stream_key = ?self.stream_key.as_ref().map(StreamKey::as_str),
            "Broadcast ended"
        );

        end_result
    }

    /// Page teardown: release everything without waiting for the network.
    ///
    /// An active broadcast gets a spawned end call that may not complete.
    pub fn teardown(&mut self) {
        match self.phase {
            IngestPhase::Active | IngestPhase::Ending => {
                self.capture.release();
                if let Some(queue) = &self.queue {
                    queue.cancel();
                }
                if self.phase == IngestPhase::Active {
                    self.spawn_end_call();
                }
                self.phase = IngestPhase::Ended;
                info!(target: "live.ingest", "Broadcast torn down");
            }
            IngestPhase::Idle | IngestPhase::Requesting => self.capture.release(),
            IngestPhase::Ended => {}
        }
    }

    fn spawn_end_call(&self) {
        let Some(key) = self.stream_key.clone() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(target: "live.ingest", "No runtime available for teardown end call");
            return;
        };
        let registry = Arc::clone(&self.registry);
        let credential = self.credential.clone();
        let timeout = self.config.end_call_timeout;
        runtime.spawn(async move {
            // Nobody is left to report to.
            let _ = tokio::time::timeout(timeout, registry.end(&credential, &key)).await;
        });
    }

    async fn shutdown_queue(&mut self) {
        if let Some(queue) = &self.queue {
            queue.cancel();
        }
        if let Some(task) = self.queue_task.take() {
            match tokio::time::timeout(self.config.end_call_timeout, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(target: "live.ingest", error = %e, "Chunk queue task panicked");
                }
                Err(_) => {
                    warn!(target: "live.ingest", "Chunk queue did not stop in time");
                }
            }
        }
    }
}

impl Drop for IngestSession {
    fn drop(&mut self) {
        if let Some(queue) = &self.queue {
            queue.cancel();
        }
        if self.phase == IngestPhase::Active {
            self.capture.release();
        }
    }
}
