//! Live Session Library
//!
//! Session and transport coordination for live broadcasts:
//!
//! - Broadcaster ingest: capture chunks are queued and sent in order over one
//!   WebSocket, paced and single-flight
//! - Viewer attachment: an HLS manifest that may not exist yet is polled until
//!   it answers, then attached to the player exactly once
//! - Lifecycle: start, end, enter and exit calls against the session
//!   registry, plus push termination over a control socket
//!
//! # Architecture
//!
//! ```text
//! IngestSession ── SessionRegistry (HTTP)
//!   └── ChunkQueue ── MediaSink (ingest WebSocket)
//!
//! ViewerSession ── SessionRegistry (HTTP)
//!   ├── ManifestPoller ── HLS proxy
//!   ├── control listener ── ControlChannel (viewer WebSocket)
//!   └── Player
//! ```
//!
//! Every network collaborator sits behind a trait (`SessionRegistry`,
//! `SocketConnector`, `CaptureDevice`, `Player`) and is passed into session
//! constructors together with an explicit `Credential`.
//!
//! # Modules
//!
//! - [`actors`] - `ChunkQueue` and `ViewerSession` actors
//! - [`config`] - Configuration from environment
//! - [`devices`] - Capture device and player seams
//! - [`errors`] - Error taxonomy
//! - [`registry`] - Session registry client
//! - [`session`] - Phase machines and the ingest session
//! - [`tasks`] - Manifest poller and control listener
//! - [`transport`] - WebSocket seam

pub mod actors;
pub mod config;
pub mod devices;
pub mod errors;
pub mod registry;
pub mod session;
pub mod tasks;
pub mod transport;

pub use actors::{ViewerSession, ViewerSessionHandle, ViewerSnapshot};
pub use config::LiveConfig;
pub use errors::LiveError;
pub use session::{IngestPhase, IngestSession, ViewerPhase};
