//! Socket seam between sessions and the network.
//!
//! Sessions never touch a WebSocket directly. They hold a [`MediaSink`]
//! (ingest, binary, client to server) or a [`ControlChannel`] (lifecycle
//! notifications, text, server to client) obtained from a
//! [`SocketConnector`]. `websocket` provides the tokio-tungstenite
//! implementation.

pub mod websocket;

pub use websocket::WsConnector;

use crate::errors::LiveError;
use async_trait::async_trait;
use common::{Credential, MediaChunk, StreamKey};

/// Outbound half of the ingest channel.
#[async_trait]
pub trait MediaSink: Send {
    /// Whether a send may be attempted right now.
    fn is_sendable(&self) -> bool;

    /// Transmit one chunk as one binary frame.
    ///
    /// # Errors
    ///
    /// Returns `LiveError::TransportLost` when the connection failed.
    async fn send(&mut self, chunk: MediaChunk) -> Result<(), LiveError>;

    /// Close the connection. Never fails; errors are logged.
    async fn close(&mut self);
}

/// Inbound half of the control channel.
#[async_trait]
pub trait ControlChannel: Send {
    /// Next text notification, or `None` once the channel is closed.
    async fn next_text(&mut self) -> Option<String>;

    /// Close the connection. Never fails; errors are logged.
    async fn close(&mut self);
}

/// Opens ingest and control connections keyed by stream key.
#[async_trait]
pub trait SocketConnector: Send + Sync {
    async fn connect_ingest(
        &self,
        stream_key: &StreamKey,
        credential: &Credential,
    ) -> Result<Box<dyn MediaSink>, LiveError>;

    async fn connect_control(
        &self,
        stream_key: &StreamKey,
        credential: &Credential,
    ) -> Result<Box<dyn ControlChannel>, LiveError>;
}
