//! Common data types for Busk Live components.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Text payload pushed on the control channel when a stream terminates.
pub const STREAM_ENDED_SENTINEL: &str = "스트림이 종료되었습니다.";

/// Returned when a stream key is empty or whitespace-only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stream key must not be empty")]
pub struct InvalidStreamKey;

/// Opaque identifier for one live session.
///
/// Issued by the session registry when a broadcast starts and used to
/// correlate the ingest socket, every viewer socket and the HLS paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StreamKey(String);

impl StreamKey {
    /// Create a stream key, rejecting empty values.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidStreamKey`] if `value` is empty or whitespace-only.
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidStreamKey> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(InvalidStreamKey);
        }
        Ok(Self(value))
    }

    /// The raw key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StreamKey {
    type Err = InvalidStreamKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for StreamKey {
    type Error = InvalidStreamKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StreamKey> for String {
    fn from(key: StreamKey) -> Self {
        key.0
    }
}

/// Which side of a live session a client is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    /// Owns the broadcast; may start and end it.
    Broadcaster,
    /// Watches a broadcast; may enter and exit it.
    Viewer,
}

impl SessionRole {
    /// HTTP header carrying the principal id for this role.
    #[must_use]
    pub fn header_name(self) -> &'static str {
        match self {
            SessionRole::Broadcaster => "X-Busker-Id",
            SessionRole::Viewer => "X-User-Id",
        }
    }

    /// Query parameter carrying the principal id on socket URIs.
    #[must_use]
    pub fn query_param(self) -> &'static str {
        match self {
            SessionRole::Broadcaster => "buskerId",
            SessionRole::Viewer => "userId",
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionRole::Broadcaster => "broadcaster",
            SessionRole::Viewer => "viewer",
        }
    }
}

/// Lifecycle vocabulary exchanged with the session registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Started,
    Ended,
    ViewerEntered,
    ViewerExited,
}

impl LifecycleEvent {
    /// Registry verb reporting the event, which is also its endpoint name.
    #[must_use]
    pub fn action(self) -> &'static str {
        match self {
            LifecycleEvent::Started => "start",
            LifecycleEvent::Ended => "end",
            LifecycleEvent::ViewerEntered => "enter",
            LifecycleEvent::ViewerExited => "exit",
        }
    }

    /// Role allowed to report the event. Any role may enter.
    #[must_use]
    pub fn required_role(self) -> Option<SessionRole> {
        match self {
            LifecycleEvent::Started | LifecycleEvent::Ended => Some(SessionRole::Broadcaster),
            LifecycleEvent::ViewerExited => Some(SessionRole::Viewer),
            LifecycleEvent::ViewerEntered => None,
        }
    }
}

/// Opaque binary fragment produced by one capture flush.
///
/// Carries no sequence number; ordering is the order of enqueue.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaChunk(Bytes);

impl MediaChunk {
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

// Chunks can be large; print the size only.
impl fmt::Debug for MediaChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaChunk")
            .field("len", &self.0.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_key_rejects_empty() {
        assert_eq!(StreamKey::new(""), Err(InvalidStreamKey));
        assert_eq!(StreamKey::new("   "), Err(InvalidStreamKey));
    }

    #[test]
    fn test_stream_key_display_is_raw() {
        let key = StreamKey::new("abc123").unwrap();
        assert_eq!(key.to_string(), "abc123");
        assert_eq!(key.as_str(), "abc123");
    }

    #[test]
    fn test_stream_key_serde_is_transparent() {
        let key: StreamKey = serde_json::from_str("\"abc123\"").unwrap();
        assert_eq!(key.as_str(), "abc123");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"abc123\"");

        let empty: Result<StreamKey, _> = serde_json::from_str("\"\"");
        assert!(empty.is_err());
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(SessionRole::Broadcaster.header_name(), "X-Busker-Id");
        assert_eq!(SessionRole::Viewer.header_name(), "X-User-Id");
        assert_eq!(SessionRole::Broadcaster.query_param(), "buskerId");
        assert_eq!(SessionRole::Viewer.query_param(), "userId");
    }

    #[test]
    fn test_lifecycle_event_serialization() {
        let json = serde_json::to_string(&LifecycleEvent::ViewerEntered).unwrap();
        assert_eq!(json, "\"viewer_entered\"");
    }

    #[test]
    fn test_lifecycle_event_actions_and_roles() {
        assert_eq!(LifecycleEvent::Started.action(), "start");
        assert_eq!(LifecycleEvent::ViewerExited.action(), "exit");
        assert_eq!(
            LifecycleEvent::Ended.required_role(),
            Some(SessionRole::Broadcaster)
        );
        assert_eq!(
            LifecycleEvent::ViewerExited.required_role(),
            Some(SessionRole::Viewer)
        );
        assert_eq!(LifecycleEvent::ViewerEntered.required_role(), None);
    }

    #[test]
    fn test_media_chunk_debug_hides_payload() {
        let chunk = MediaChunk::new(vec![0xde, 0xad, 0xbe, 0xef]);
        let debug = format!("{chunk:?}");
        assert!(debug.contains("len: 4"));
        assert_eq!(chunk.as_bytes(), &[0xde, 0xad, 0xbe, 0xef]);
    }
}
