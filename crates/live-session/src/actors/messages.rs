//! Viewer actor message types.
//!
//! Commands come from the session handle; task events come from the tasks
//! the actor spawns for itself. Both travel over mpsc channels into the one
//! actor loop that owns the player and the phase.

use crate::errors::LiveError;
use crate::registry::EnterResponse;
use crate::session::ViewerPhase;
use crate::tasks::ControlSignal;
use tokio::sync::oneshot;

/// Commands from a [`ViewerSessionHandle`](super::ViewerSessionHandle).
#[derive(Debug)]
pub enum ViewerCommand {
    /// A non-host viewer leaves; issues the exit call.
    Leave {
        respond_to: oneshot::Sender<Result<(), LiveError>>,
    },
    /// The host ends the stream; issues the end call.
    End {
        respond_to: oneshot::Sender<Result<(), LiveError>>,
    },
    /// Page teardown. Nothing is awaited.
    Unload,
}

/// Reports from the viewer's background tasks.
#[derive(Debug)]
pub enum TaskEvent {
    /// The enter call finished.
    Entered(Result<EnterResponse, LiveError>),
    /// The manifest answered after `attempts` probes.
    ManifestReady { attempts: u32 },
    Control(ControlSignal),
}

impl From<ControlSignal> for TaskEvent {
    fn from(signal: ControlSignal) -> Self {
        TaskEvent::Control(signal)
    }
}

/// Published view of a viewer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerSnapshot {
    pub phase: ViewerPhase,
    /// Title from the enter call, once it has answered.
    pub title: Option<String>,
    /// Cached count from the enter call. The registry is authoritative.
    pub viewer_count: u64,
    /// Only ever flips from `false` to `true`.
    pub manifest_ready: bool,
    /// Whether the control socket opened.
    pub control_connected: bool,
}

impl Default for ViewerSnapshot {
    fn default() -> Self {
        Self {
            phase: ViewerPhase::Joining,
            title: None,
            viewer_count: 0,
            manifest_ready: false,
            control_connected: false,
        }
    }
}
