//! Common types shared across Busk Live components.

#![warn(clippy::pedantic)]

/// Module for session identity and lifecycle types
pub mod types;

/// Module for the role-scoped credential presented on every call
pub mod credential;

pub use credential::{Credential, CredentialError};
pub use types::{
    InvalidStreamKey, LifecycleEvent, MediaChunk, SessionRole, StreamKey, STREAM_ENDED_SENTINEL,
};
