//! Local media devices owned by sessions.
//!
//! The capture device belongs exclusively to the active ingest session and
//! the playback surface to the current viewer session. Both are driven
//! synchronously from the owning session's task.

use crate::errors::LiveError;

/// Camera/microphone pair feeding an ingest session.
///
/// The device's chunk producer pushes through
/// [`IngestSession::push_chunk`](crate::session::IngestSession::push_chunk);
/// `release` must stop that producer as well as the tracks.
pub trait CaptureDevice: Send {
    /// Bind the device to the local live preview.
    fn attach_preview(&mut self) -> Result<(), LiveError>;

    /// Stop the chunk producer and release all tracks. Idempotent.
    fn release(&mut self);
}

/// Video playback surface of a viewer session.
pub trait Player: Send {
    /// Load the manifest and bind it to the surface.
    fn attach(&mut self, manifest_url: &str) -> Result<(), LiveError>;

    /// Detach the source and return the surface to an empty state.
    fn reset(&mut self);
}
