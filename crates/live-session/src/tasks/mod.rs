//! Background tasks spawned by viewer sessions.
//!
//! # Tasks
//!
//! - `manifest_poller` - Probes the playback manifest until it answers
//! - `control_listener` - Forwards termination notifications from the control socket

pub mod control_listener;
pub mod manifest_poller;

pub use control_listener::{run_control_listener, ControlSignal};
pub use manifest_poller::ManifestPoller;
