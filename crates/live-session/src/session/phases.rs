//! Session phase machines.
//!
//! Phases change only through named events. Both machines are plain values
//! so transitions can be exercised without sockets, devices or a runtime.

use crate::errors::LiveError;

/// Broadcaster-side phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestPhase {
    Idle,
    Requesting,
    Active,
    Ending,
    /// Absorbing.
    Ended,
}

/// Events driving [`IngestPhase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestEvent {
    StartRequested,
    StartSucceeded,
    StartFailed,
    StopRequested,
    EndCompleted,
}

impl IngestEvent {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            IngestEvent::StartRequested => "start_requested",
            IngestEvent::StartSucceeded => "start_succeeded",
            IngestEvent::StartFailed => "start_failed",
            IngestEvent::StopRequested => "stop_requested",
            IngestEvent::EndCompleted => "end_completed",
        }
    }
}

impl IngestPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            IngestPhase::Idle => "idle",
            IngestPhase::Requesting => "requesting",
            IngestPhase::Active => "active",
            IngestPhase::Ending => "ending",
            IngestPhase::Ended => "ended",
        }
    }

    /// Apply an event.
    ///
    /// # Errors
    ///
    /// Returns `LiveError::InvalidTransition` for events that are not legal
    /// in the current phase. `Ended` ignores stop and end events but never
    /// starts again.
    pub fn on(self, event: IngestEvent) -> Result<IngestPhase, LiveError> {
        use IngestEvent as E;
        use IngestPhase as P;

        match (self, event) {
            (P::Idle, E::StartRequested) => Ok(P::Requesting),
            (P::Requesting, E::StartSucceeded) => Ok(P::Active),
            (P::Requesting, E::StartFailed) => Ok(P::Idle),
            (P::Active, E::StopRequested) => Ok(P::Ending),
            (P::Ending, E::EndCompleted) => Ok(P::Ended),
            (P::Ended, E::StopRequested | E::EndCompleted) => Ok(P::Ended),
            (P::Ended, E::StartRequested | E::StartSucceeded | E::StartFailed)
            | (
                P::Idle | P::Requesting | P::Active | P::Ending,
                E::StartRequested
                | E::StartSucceeded
                | E::StartFailed
                | E::StopRequested
                | E::EndCompleted,
            ) => Err(LiveError::InvalidTransition {
                phase: self.as_str(),
                event: event.as_str(),
            }),
        }
    }
}

/// Viewer-side phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerPhase {
    Joining,
    Watching,
    /// The stream ended. Absorbing.
    Ended,
    /// The viewer left. Absorbing.
    Exited,
}

/// Events driving [`ViewerPhase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerEvent {
    /// The manifest answered and the player is attached.
    ManifestReady,
    /// Termination sentinel arrived on the control channel.
    EndReceived,
    /// The host ended the stream from this session.
    HostEnded,
    /// A non-host viewer left explicitly.
    Left,
    /// The page is being torn down.
    Unloaded,
}

impl ViewerPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ViewerPhase::Joining => "joining",
            ViewerPhase::Watching => "watching",
            ViewerPhase::Ended => "ended",
            ViewerPhase::Exited => "exited",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, ViewerPhase::Ended | ViewerPhase::Exited)
    }

    /// Apply an event. Every event is legal; terminal phases ignore them all.
    #[must_use]
    pub fn on(self, event: ViewerEvent) -> ViewerPhase {
        use ViewerEvent as E;
        use ViewerPhase as P;

        match (self, event) {
            (P::Ended | P::Exited, _) => self,
            (P::Joining | P::Watching, E::ManifestReady) => P::Watching,
            (P::Joining | P::Watching, E::EndReceived | E::HostEnded) => P::Ended,
            (P::Joining | P::Watching, E::Left | E::Unloaded) => P::Exited,
        }
    }
}
