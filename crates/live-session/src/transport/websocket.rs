//! WebSocket transport over tokio-tungstenite.
//!
//! Both channels carry the stream key and the role-appropriate principal id
//! as query parameters: `{url}?streamKey={key}&{buskerId|userId}={id}`.

use super::{ControlChannel, MediaSink, SocketConnector};
use crate::errors::LiveError;
use async_trait::async_trait;
use common::{Credential, MediaChunk, StreamKey};
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, instrument, warn};

/// Upper bound on the WebSocket handshake.
const SOCKET_CONNECT_TIMEOUT_SECS: u64 = 10;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connector for the ingest and viewer control WebSocket endpoints.
#[derive(Debug, Clone)]
pub struct WsConnector {
    ingest_url: String,
    control_url: String,
}

impl WsConnector {
    #[must_use]
    pub fn new(ingest_url: impl Into<String>, control_url: impl Into<String>) -> Self {
        Self {
            ingest_url: ingest_url.into(),
            control_url: control_url.into(),
        }
    }

    /// Build the connection URI for a stream and credential.
    ///
    /// # Errors
    ///
    /// Returns `LiveError::Validation` if `base` is not a valid URL.
    pub fn socket_uri(
        base: &str,
        stream_key: &StreamKey,
        credential: &Credential,
    ) -> Result<String, LiveError> {
        let mut url = Url::parse(base)
            .map_err(|e| LiveError::Validation(format!("invalid socket url '{}': {}", base, e)))?;
        url.query_pairs_mut()
            .append_pair("streamKey", stream_key.as_str())
            .append_pair(credential.query_param(), &credential.principal_id);
        Ok(url.into())
    }

    async fn open(uri: &str) -> Result<WsStream, LiveError> {
        let connect = tokio_tungstenite::connect_async(uri);
        match tokio::time::timeout(Duration::from_secs(SOCKET_CONNECT_TIMEOUT_SECS), connect).await
        {
            Ok(Ok((stream, response))) => {
                debug!(
                    target: "live.transport",
                    status = %response.status(),
                    "WebSocket handshake complete"
                );
                Ok(stream)
            }
            Ok(Err(e)) => {
                warn!(target: "live.transport", error = %e, "WebSocket connect failed");
                Err(LiveError::TransportLost(format!("connect failed: {}", e)))
            }
            Err(_) => {
                warn!(target: "live.transport", "WebSocket connect timed out");
                Err(LiveError::TransportLost("connect timed out".to_string()))
            }
        }
    }
}

#[async_trait]
impl SocketConnector for WsConnector {
    #[instrument(skip_all, name = "live.transport.connect_ingest", fields(stream_key = %stream_key))]
    async fn connect_ingest(
        &self,
        stream_key: &StreamKey,
        credential: &Credential,
    ) -> Result<Box<dyn MediaSink>, LiveError> {
        let uri = Self::socket_uri(&self.ingest_url, stream_key, credential)?;
        let stream = Self::open(&uri).await?;
        Ok(Box::new(WsMediaSink { stream, open: true }))
    }

    #[instrument(skip_all, name = "live.transport.connect_control", fields(stream_key = %stream_key))]
    async fn connect_control(
        &self,
        stream_key: &StreamKey,
        credential: &Credential,
    ) -> Result<Box<dyn ControlChannel>, LiveError> {
        let uri = Self::socket_uri(&self.control_url, stream_key, credential)?;
        let stream = Self::open(&uri).await?;
        Ok(Box::new(WsControlChannel { stream, open: true }))
    }
}

/// Ingest socket: one binary frame per chunk.
pub struct WsMediaSink {
    stream: WsStream,
    open: bool,
}

#[async_trait]
impl MediaSink for WsMediaSink {
    fn is_sendable(&self) -> bool {
        self.open
    }

    async fn send(&mut self, chunk: MediaChunk) -> Result<(), LiveError> {
        if let Err(e) = self.stream.send(Message::Binary(chunk.into_bytes())).await {
            self.open = false;
            return Err(LiveError::TransportLost(e.to_string()));
        }
        Ok(())
    }

    async fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Err(e) = self.stream.close(None).await {
            debug!(target: "live.transport", error = %e, "Ingest socket close failed");
        }
    }
}

/// Control socket: text notifications from the server.
pub struct WsControlChannel {
    stream: WsStream,
    open: bool,
}

#[async_trait]
impl ControlChannel for WsControlChannel {
    async fn next_text(&mut self) -> Option<String> {
        while self.open {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(text.as_str().to_string()),
                Some(Ok(Message::Close(frame))) => {
                    debug!(target: "live.transport", frame = ?frame, "Control socket closed by server");
                    self.open = false;
                }
                // Binary, ping, pong and raw frames carry no lifecycle information.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(target: "live.transport", error = %e, "Control socket read failed");
                    self.open = false;
                }
                None => self.open = false,
            }
        }
        None
    }

    async fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Err(e) = self.stream.close(None).await {
            debug!(target: "live.transport", error = %e, "Control socket close failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_uri_for_broadcaster() {
        let key = StreamKey::new("abc123").unwrap();
        let uri = WsConnector::socket_uri(
            "ws://ingest.local/ws/stream",
            &key,
            &Credential::broadcaster("busker-123"),
        )
        .unwrap();
        assert_eq!(
            uri,
            "ws://ingest.local/ws/stream?streamKey=abc123&buskerId=busker-123"
        );
    }

    #[test]
    fn test_socket_uri_for_viewer_encodes_values() {
        let key = StreamKey::new("a b").unwrap();
        let uri = WsConnector::socket_uri(
            "ws://ingest.local/ws/viewer",
            &key,
            &Credential::viewer("user&456"),
        )
        .unwrap();
        assert_eq!(
            uri,
            "ws://ingest.local/ws/viewer?streamKey=a+b&userId=user%26456"
        );
    }

    #[test]
    fn test_socket_uri_rejects_garbage_base() {
        let key = StreamKey::new("abc123").unwrap();
        let result = WsConnector::socket_uri("not a url", &key, &Credential::viewer("u"));
        assert!(matches!(result, Err(LiveError::Validation(_))));
    }

    #[tokio::test]
    async fn test_connect_refused_is_transport_lost() {
        let connector = WsConnector::new("ws://127.0.0.1:9/ingest", "ws://127.0.0.1:9/viewer");
        let key = StreamKey::new("abc123").unwrap();
        let result = connector
            .connect_control(&key, &Credential::viewer("user-456"))
            .await;
        assert!(matches!(result, Err(LiveError::TransportLost(_))));
    }
}
