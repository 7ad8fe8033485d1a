//! `ViewerSession` - one attachment of a viewer (or the host) to a stream.
//!
//! Each `ViewerSession`:
//! - Owns the [`Player`] and the [`ViewerPhase`]; nothing else touches either
//! - Spawns three tasks on join: the enter call, the manifest poller and the
//!   control listener, all reporting into one event channel
//! - Publishes a [`ViewerSnapshot`] through a `watch` channel
//!
//! # Lifecycle
//!
//! 1. `Joining` on spawn; the three tasks run independently
//! 2. `Watching` once the manifest answers and the player attaches
//! 3. `Ended` on the termination sentinel or the host's own end
//! 4. `Exited` on leave, unload, cancellation or when every handle is dropped
//!
//! Entering a terminal phase resets the player exactly once, cancels the
//! tasks (closing the control socket) and stops the actor.

use super::messages::{TaskEvent, ViewerCommand, ViewerSnapshot};
use crate::config::LiveConfig;
use crate::devices::Player;
use crate::errors::LiveError;
use crate::registry::SessionRegistry;
use crate::session::{ViewerEvent, ViewerPhase};
use crate::tasks::{run_control_listener, ControlSignal, ManifestPoller};
use crate::transport::SocketConnector;
use common::{Credential, LifecycleEvent, SessionRole, StreamKey};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Command mailbox size.
const VIEWER_COMMAND_BUFFER: usize = 16;

/// Task event mailbox size.
const VIEWER_EVENT_BUFFER: usize = 16;

/// How long a stopping actor waits for each of its tasks.
const TASK_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Handle to a `ViewerSession`.
#[derive(Clone, Debug)]
pub struct ViewerSessionHandle {
    sender: mpsc::Sender<ViewerCommand>,
    snapshot: watch::Receiver<ViewerSnapshot>,
    cancel_token: CancellationToken,
    stream_key: StreamKey,
}

impl ViewerSessionHandle {
    #[must_use]
    pub fn stream_key(&self) -> &StreamKey {
        &self.stream_key
    }

    /// Leave the stream as a non-host viewer.
    ///
    /// The session is `Exited` afterwards even if the exit call failed.
    ///
    /// # Errors
    ///
    /// - `LiveError::Validation` for a host session
    /// - `LiveError::Registry` if the exit call failed
    pub async fn leave(&self) -> Result<(), LiveError> {
        self.request(|respond_to| ViewerCommand::Leave { respond_to })
            .await
    }

    /// End the stream as its host.
    ///
    /// The session is `Ended` afterwards even if the end call failed.
    ///
    /// # Errors
    ///
    /// - `LiveError::Validation` for a non-host session
    /// - `LiveError::EndFailed` if the end call failed or timed out
    pub async fn end(&self) -> Result<(), LiveError> {
        self.request(|respond_to| ViewerCommand::End { respond_to })
            .await
    }

    /// Page teardown. Returns immediately; the exit call it triggers may
    /// never complete.
    pub fn unload(&self) {
        if self.sender.try_send(ViewerCommand::Unload).is_err() {
            // Mailbox full or actor gone: skip the network, still tear down.
            self.cancel_token.cancel();
        }
    }

    /// Stop the session without any network call.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn snapshot(&self) -> ViewerSnapshot {
        self.snapshot.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ViewerSnapshot> {
        self.snapshot.clone()
    }

    /// Wait for `Ended` or `Exited`.
    pub async fn wait_until_terminal(&self) -> ViewerPhase {
        let mut snapshot = self.snapshot.clone();
        let outcome = snapshot
            .wait_for(|s| s.phase.is_terminal())
            .await
            .map(|s| s.phase);
        match outcome {
            Ok(phase) => phase,
            Err(_) => snapshot.borrow().phase,
        }
    }

    async fn request(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<(), LiveError>>) -> ViewerCommand,
    ) -> Result<(), LiveError> {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(command(tx)).await.is_err() {
            return self.closed_outcome();
        }
        match rx.await {
            Ok(result) => result,
            Err(_) => self.closed_outcome(),
        }
    }

    /// Commands sent to a stopped actor succeed only if it stopped terminal.
    fn closed_outcome(&self) -> Result<(), LiveError> {
        if self.snapshot.borrow().phase.is_terminal() {
            Ok(())
        } else {
            Err(LiveError::Internal("viewer session stopped".to_string()))
        }
    }
}

/// The `ViewerSession` actor.
pub struct ViewerSession {
    stream_key: StreamKey,
    credential: Credential,
    registry: Arc<dyn SessionRegistry>,
    player: Box<dyn Player>,
    manifest_url: String,
    end_call_timeout: Duration,
    commands: mpsc::Receiver<ViewerCommand>,
    events: mpsc::Receiver<TaskEvent>,
    cancel_token: CancellationToken,
    /// Child of `cancel_token`; cancelled on entering a terminal phase.
    tasks_token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    state: ViewerSnapshot,
    snapshot: watch::Sender<ViewerSnapshot>,
}

impl ViewerSession {
    /// Join a stream: spawn the actor and its tasks.
    ///
    /// # Errors
    ///
    /// - `LiveError::Validation` for an unusable credential
    /// - `LiveError::Internal` if the probe client cannot be built
    pub fn join(
        stream_key: StreamKey,
        credential: Credential,
        registry: Arc<dyn SessionRegistry>,
        connector: Arc<dyn SocketConnector>,
        player: Box<dyn Player>,
        config: &LiveConfig,
    ) -> Result<(ViewerSessionHandle, JoinHandle<()>), LiveError> {
        credential.validate()?;

        let probe_client = reqwest::Client::builder()
            .build()
            .map_err(|e| LiveError::Internal(format!("failed to build probe client: {e}")))?;

        let (command_tx, command_rx) = mpsc::channel(VIEWER_COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::channel(VIEWER_EVENT_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(ViewerSnapshot::default());
        let cancel_token = CancellationToken::new();
        let tasks_token = cancel_token.child_token();
        let manifest_url = config.manifest_url(&stream_key);

        let mut tasks = Vec::with_capacity(3);
        tasks.push(spawn_enter(
            Arc::clone(&registry),
            credential.clone(),
            stream_key.clone(),
            event_tx.clone(),
            tasks_token.clone(),
        ));
        tasks.push(spawn_poller(
            ManifestPoller::new(
                probe_client,
                manifest_url.clone(),
                config.manifest_poll_interval,
                config.manifest_probe_timeout,
            ),
            event_tx.clone(),
            tasks_token.clone(),
        ));
        tasks.push(tokio::spawn(run_control_listener(
            connector,
            stream_key.clone(),
            credential.clone(),
            config.control_settle_delay,
            event_tx,
            tasks_token.clone(),
        )));

        let actor = Self {
            stream_key: stream_key.clone(),
            credential,
            registry,
            player,
            manifest_url,
            end_call_timeout: config.end_call_timeout,
            commands: command_rx,
            events: event_rx,
            cancel_token: cancel_token.clone(),
            tasks_token,
            tasks,
            state: ViewerSnapshot::default(),
            snapshot: snapshot_tx,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = ViewerSessionHandle {
            sender: command_tx,
            snapshot: snapshot_rx,
            cancel_token,
            stream_key,
        };

        Ok((handle, task_handle))
    }

    #[instrument(
        skip_all,
        name = "live.viewer",
        fields(stream_key = %self.stream_key, role = self.credential.role.as_str())
    )]
    async fn run(mut self) {
        debug!(target: "live.viewer", "ViewerSession started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!(target: "live.viewer", "ViewerSession received cancellation signal");
                    self.apply(ViewerEvent::Unloaded);
                }

                cmd = self.commands.recv() => match cmd {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!(target: "live.viewer", "All handles dropped");
                        self.apply(ViewerEvent::Unloaded);
                    }
                },

                Some(event) = self.events.recv() => self.handle_event(event),
            }

            if self.state.phase.is_terminal() {
                break;
            }
        }

        self.tasks_token.cancel();
        for task in self.tasks.drain(..) {
            if tokio::time::timeout(TASK_SHUTDOWN_TIMEOUT, task).await.is_err() {
                warn!(target: "live.viewer", "Viewer task did not stop in time");
            }
        }

        info!(
            target: "live.viewer",
            phase = self.state.phase.as_str(),
            "ViewerSession stopped"
        );
    }

    /// Apply a phase event. Entering a terminal phase resets the player.
    fn apply(&mut self, event: ViewerEvent) {
        let before = self.state.phase;
        let after = before.on(event);
        if before == after {
            return;
        }

        debug!(
            target: "live.viewer",
            from = before.as_str(),
            to = after.as_str(),
            "Viewer phase transition"
        );
        self.state.phase = after;

        if after.is_terminal() {
            self.player.reset();
            self.tasks_token.cancel();
        }
        self.publish();
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.state.clone());
    }

    fn handle_event(&mut self, event: TaskEvent) {
        if self.state.phase.is_terminal() {
            return;
        }

        match event {
            TaskEvent::Entered(Ok(entered)) => {
                info!(
                    target: "live.viewer",
                    title = %entered.title,
                    viewer_count = entered.viewer_count,
                    "Entered stream"
                );
                self.state.title = Some(entered.title);
                self.state.viewer_count = entered.viewer_count;
                self.publish();
            }
            TaskEvent::Entered(Err(e)) => {
                warn!(
                    target: "live.viewer",
                    error = %e,
                    "Enter call failed, playback continues"
                );
            }
            TaskEvent::ManifestReady { attempts } => {
                if self.state.manifest_ready {
                    return;
                }
                match self.player.attach(&self.manifest_url) {
                    Ok(()) => {
                        info!(
                            target: "live.viewer",
                            attempts = attempts,
                            "Player attached"
                        );
                        self.state.manifest_ready = true;
                        self.apply(ViewerEvent::ManifestReady);
                    }
                    Err(e) => {
                        error!(target: "live.viewer", error = %e, "Player failed to attach");
                    }
                }
            }
            TaskEvent::Control(ControlSignal::Connected) => {
                self.state.control_connected = true;
                self.publish();
            }
            TaskEvent::Control(ControlSignal::Unavailable(reason)) => {
                debug!(
                    target: "live.viewer",
                    reason = %reason,
                    "Watching without end notifications"
                );
            }
            TaskEvent::Control(ControlSignal::StreamEnded) => {
                info!(target: "live.viewer", "Stream ended by host");
                self.apply(ViewerEvent::EndReceived);
            }
        }
    }

    async fn handle_command(&mut self, command: ViewerCommand) {
        match command {
            ViewerCommand::Leave { respond_to } => {
                let result = self.leave().await;
                let _ = respond_to.send(result);
            }
            ViewerCommand::End { respond_to } => {
                let result = self.end().await;
                let _ = respond_to.send(result);
            }
            ViewerCommand::Unload => self.unload(),
        }
    }

    async fn leave(&mut self) -> Result<(), LiveError> {
        if self.state.phase.is_terminal() {
            return Ok(());
        }
        self.credential.require(SessionRole::Viewer, "leave")?;

        let result = self
            .registry
            .exit(&self.credential, &self.stream_key)
            .await;
        if let Err(e) = &result {
            warn!(target: "live.viewer", error = %e, "Exit call failed, leaving locally");
        }

        self.apply(ViewerEvent::Left);
        result
    }

    async fn end(&mut self) -> Result<(), LiveError> {
        if self.state.phase.is_terminal() {
            return Ok(());
        }
        self.credential.authorize(LifecycleEvent::Ended)?;

        let end_call = self.registry.end(&self.credential, &self.stream_key);
        let result = match tokio::time::timeout(self.end_call_timeout, end_call).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(LiveError::EndFailed(e.to_string())),
            Err(_) => Err(LiveError::EndFailed("end call timed out".to_string())),
        };
        if let Err(e) = &result {
            warn!(target: "live.viewer", error = %e, "End call failed, ending locally");
        }

        info!(target: "live.viewer", "Stream ended from host view");
        self.apply(ViewerEvent::HostEnded);
        result
    }

    fn unload(&mut self) {
        if self.state.phase.is_terminal() {
            return;
        }

        if self.credential.role == SessionRole::Viewer {
            let registry = Arc::clone(&self.registry);
            let credential = self.credential.clone();
            let stream_key = self.stream_key.clone();
            // Best effort: the result is never observed.
            tokio::spawn(async move {
                let _ = registry.exit(&credential, &stream_key).await;
            });
        }

        self.apply(ViewerEvent::Unloaded);
    }
}

fn spawn_enter(
    registry: Arc<dyn SessionRegistry>,
    credential: Credential,
    stream_key: StreamKey,
    events: mpsc::Sender<TaskEvent>,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            () = cancel_token.cancelled() => {}
            result = registry.enter(&credential, &stream_key) => {
                let _ = events.send(TaskEvent::Entered(result)).await;
            }
        }
    })
}

fn spawn_poller(
    poller: ManifestPoller,
    events: mpsc::Sender<TaskEvent>,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Some(attempts) = poller.wait_until_ready(&cancel_token).await {
            let _ = events.send(TaskEvent::ManifestReady { attempts }).await;
        }
    })
}
