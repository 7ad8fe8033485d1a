//! Live session error types.
//!
//! The taxonomy mirrors how each failure is surfaced to the person at the
//! keyboard: validation failures are immediate, control-plane rejections are
//! never retried automatically, and manifest unavailability is a loading
//! state rather than an error.

use common::{CredentialError, InvalidStreamKey};
use thiserror::Error;

/// Live session error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiveError {
    /// Missing title or credential; nothing was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The registry rejected a start call or the ingest socket failed to open.
    #[error("Start failed: {0}")]
    StartFailed(String),

    /// The registry rejected or never answered an end call.
    #[error("End failed: {0}")]
    EndFailed(String),

    /// Enter, exit or listing call failed.
    #[error("Registry error: {0}")]
    Registry(String),

    /// The ingest socket dropped mid-broadcast. The broadcaster has to restart.
    #[error("Transport lost: {0}")]
    TransportLost(String),

    /// The playback manifest is not reachable yet.
    #[error("Manifest unavailable: {0}")]
    ManifestUnavailable(String),

    /// Camera, microphone or playback surface refused to come up.
    #[error("Device error: {0}")]
    Device(String),

    /// The chunk queue's command channel is full.
    #[error("Chunk queue is full")]
    QueueFull,

    /// The requested command is not legal in the current phase.
    #[error("Invalid transition: {event} while {phase}")]
    InvalidTransition {
        phase: &'static str,
        event: &'static str,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LiveError {
    /// Whether the failure is worth retrying without user involvement.
    ///
    /// Only manifest unavailability qualifies; retrying a start could
    /// duplicate sessions.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, LiveError::ManifestUnavailable(_))
    }
}

impl From<CredentialError> for LiveError {
    fn from(err: CredentialError) -> Self {
        LiveError::Validation(err.to_string())
    }
}

impl From<InvalidStreamKey> for LiveError {
    fn from(err: InvalidStreamKey) -> Self {
        LiveError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_validation() {
        let error = LiveError::Validation("title is required".to_string());
        assert_eq!(format!("{}", error), "Validation error: title is required");
    }

    #[test]
    fn test_display_invalid_transition() {
        let error = LiveError::InvalidTransition {
            phase: "idle",
            event: "stop",
        };
        assert_eq!(format!("{}", error), "Invalid transition: stop while idle");
    }

    #[test]
    fn test_only_manifest_unavailable_is_transient() {
        assert!(LiveError::ManifestUnavailable("404".to_string()).is_transient());
        assert!(!LiveError::StartFailed("500".to_string()).is_transient());
        assert!(!LiveError::TransportLost("reset".to_string()).is_transient());
        assert!(!LiveError::QueueFull.is_transient());
    }

    #[test]
    fn test_credential_error_maps_to_validation() {
        let error: LiveError = CredentialError::EmptyPrincipal.into();
        assert!(matches!(error, LiveError::Validation(msg) if msg.contains("principal")));
    }
}
