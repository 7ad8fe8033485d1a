//! `ChunkQueue` - per-connection ordered buffer of outbound media chunks.
//!
//! Each `ChunkQueue`:
//! - Owns exactly one [`MediaSink`] (the ingest socket)
//! - Accepts chunks through a bounded channel without ever blocking the caller
//! - Holds at most `capacity` chunks in its own buffer; once that is full the
//!   channel backs up and `enqueue` reports `QueueFull`
//! - Drains from a single loop, at most one send per tick, awaiting each send
//!   before the next tick so two sends can never be outstanding
//!
//! # Lifecycle
//!
//! 1. Spawned when the ingest session becomes active
//! 2. Holds chunks while the sink is not sendable
//! 3. Stops on the first send failure and publishes `TransportLost`
//! 4. On cancellation closes the sink and discards whatever is still queued

use crate::errors::LiveError;
use crate::transport::MediaSink;
use common::{MediaChunk, StreamKey};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Drain state published by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueStatus {
    Draining,
    /// The sink failed; nothing further will be sent.
    TransportLost(String),
    /// The queue was shut down.
    Closed,
}

/// Tunables for one queue.
#[derive(Debug, Clone, Copy)]
pub struct ChunkQueueConfig {
    /// Capacity of the command channel between producer and drain loop,
    /// and of the drain loop's own pending buffer.
    pub capacity: usize,
    /// Minimum spacing between two sends.
    pub send_interval: Duration,
}

/// Chunk counters.
#[derive(Debug, Default)]
pub struct QueueStats {
    enqueued: AtomicU64,
    sent: AtomicU64,
    discarded: AtomicU64,
}

impl QueueStats {
    #[must_use]
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

/// Handle to a `ChunkQueue`.
#[derive(Clone, Debug)]
pub struct ChunkQueueHandle {
    sender: mpsc::Sender<MediaChunk>,
    status: watch::Receiver<QueueStatus>,
    cancel_token: CancellationToken,
    stats: Arc<QueueStats>,
}

impl ChunkQueueHandle {
    /// Append a chunk to the tail. Never waits.
    ///
    /// # Errors
    ///
    /// - `LiveError::QueueFull` if the command channel is at capacity
    /// - `LiveError::TransportLost` once the sink has failed
    /// - `LiveError::Internal` after shutdown
    pub fn enqueue(&self, chunk: MediaChunk) -> Result<(), LiveError> {
        match self.sender.try_send(chunk) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => Err(LiveError::QueueFull),
            Err(mpsc::error::TrySendError::Closed(_)) => match self.status() {
                QueueStatus::TransportLost(reason) => Err(LiveError::TransportLost(reason)),
                QueueStatus::Draining | QueueStatus::Closed => {
                    Err(LiveError::Internal("chunk queue is closed".to_string()))
                }
            },
        }
    }

    /// Current drain status.
    #[must_use]
    pub fn status(&self) -> QueueStatus {
        self.status.borrow().clone()
    }

    /// Watch drain status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<QueueStatus> {
        self.status.clone()
    }

    #[must_use]
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    /// Stop the drain loop; the sink is closed and pending chunks are dropped.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// The `ChunkQueue` drain loop.
pub struct ChunkQueue {
    stream_key: StreamKey,
    receiver: mpsc::Receiver<MediaChunk>,
    sink: Box<dyn MediaSink>,
    pending: VecDeque<MediaChunk>,
    capacity: usize,
    send_interval: Duration,
    cancel_token: CancellationToken,
    status: watch::Sender<QueueStatus>,
    stats: Arc<QueueStats>,
    /// Set while chunks are held for an unsendable sink, to log once.
    holding: bool,
}

impl ChunkQueue {
    /// Spawn a new queue draining into `sink`.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        stream_key: StreamKey,
        sink: Box<dyn MediaSink>,
        config: ChunkQueueConfig,
        cancel_token: CancellationToken,
    ) -> (ChunkQueueHandle, JoinHandle<()>) {
        let capacity = config.capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let (status_tx, status_rx) = watch::channel(QueueStatus::Draining);
        let stats = Arc::new(QueueStats::default());

        let queue = Self {
            stream_key,
            receiver,
            sink,
            pending: VecDeque::with_capacity(capacity),
            capacity,
            send_interval: config.send_interval,
            cancel_token: cancel_token.clone(),
            status: status_tx,
            stats: Arc::clone(&stats),
            holding: false,
        };

        let task_handle = tokio::spawn(queue.run());

        let handle = ChunkQueueHandle {
            sender,
            status: status_rx,
            cancel_token,
            stats,
        };

        (handle, task_handle)
    }

    #[instrument(skip_all, name = "live.chunk_queue", fields(stream_key = %self.stream_key))]
    async fn run(mut self) {
        debug!(target: "live.chunk_queue", "ChunkQueue started");

        let mut ticker = tokio::time::interval(self.send_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    debug!(target: "live.chunk_queue", "ChunkQueue received cancellation signal");
                    break;
                }

                // Stop pulling while the buffer is full so the channel fills up.
                msg = self.receiver.recv(), if self.pending.len() < self.capacity => {
                    match msg {
                        Some(chunk) => self.pending.push_back(chunk),
                        None => {
                            debug!(target: "live.chunk_queue", "All producers dropped, exiting");
                            break;
                        }
                    }
                }

                _ = ticker.tick() => {
                    if let Err(reason) = self.drain_one().await {
                        warn!(
                            target: "live.chunk_queue",
                            reason = %reason,
                            pending = self.pending.len(),
                            "Ingest transport lost, draining stopped"
                        );
                        self.status.send_replace(QueueStatus::TransportLost(reason));
                        break;
                    }
                }
            }
        }

        self.finish().await;
    }

    /// Send the head of the queue if the sink can take it.
    ///
    /// Returns the failure reason if the sink errored.
    async fn drain_one(&mut self) -> Result<(), String> {
        if self.pending.is_empty() {
            return Ok(());
        }

        if !self.sink.is_sendable() {
            if !self.holding {
                debug!(
                    target: "live.chunk_queue",
                    pending = self.pending.len(),
                    "Sink not sendable, holding chunks"
                );
                self.holding = true;
            }
            return Ok(());
        }
        self.holding = false;

        let Some(chunk) = self.pending.pop_front() else {
            return Ok(());
        };

        tokio::select! {
            result = self.sink.send(chunk) => match result {
                Ok(()) => {
                    self.stats.sent.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
                Err(e) => Err(e.to_string()),
            },
            // Teardown mid-send: the in-flight chunk is lost with the rest.
            () = self.cancel_token.cancelled() => Ok(()),
        }
    }

    async fn finish(&mut self) {
        self.receiver.close();
        while let Ok(chunk) = self.receiver.try_recv() {
            self.pending.push_back(chunk);
        }

        let discarded = self.pending.len() as u64;
        self.pending.clear();
        self.stats.discarded.fetch_add(discarded, Ordering::Relaxed);

        self.sink.close().await;

        self.status.send_if_modified(|status| {
            if *status == QueueStatus::Draining {
                *status = QueueStatus::Closed;
                true
            } else {
                false
            }
        });

        info!(
            target: "live.chunk_queue",
            stream_key = %self.stream_key,
            sent = self.stats.sent(),
            discarded = discarded,
            "ChunkQueue stopped"
        );
    }
}
