//! Mock ingest WebSocket server.
//!
//! Accepts broadcaster sockets on `/ws` and records every binary frame in
//! arrival order, the query parameters of each connection, and how many
//! sockets have closed.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Clone, Default)]
struct IngestState {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
    connections: Arc<Mutex<Vec<HashMap<String, String>>>>,
    closed: Arc<AtomicUsize>,
}

/// In-process ingest endpoint.
pub struct MockIngestServer {
    addr: SocketAddr,
    state: IngestState,
    _handle: JoinHandle<()>,
}

impl MockIngestServer {
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        let state = IngestState::default();
        let app = Router::new()
            .route("/ws", get(upgrade))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind mock ingest: {}", e))?;
        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Mock ingest error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// URL to configure as `STREAM_WS_URL`.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Binary frames received so far, across all connections.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.state.frames.lock().unwrap().clone()
    }

    /// Query parameters of every accepted connection.
    pub fn connections(&self) -> Vec<HashMap<String, String>> {
        self.state.connections.lock().unwrap().clone()
    }

    /// Number of sockets that have gone away.
    pub fn closed_count(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Poll until at least `count` frames arrived. Panics on timeout.
    pub async fn wait_for_frames(&self, count: usize, timeout: Duration) -> Vec<Vec<u8>> {
        let wait = async {
            loop {
                let frames = self.frames();
                if frames.len() >= count {
                    return frames;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .unwrap_or_else(|_| panic!("expected {} ingest frames, got {}", count, self.frames().len()))
    }

    /// Poll until at least `count` sockets closed. Panics on timeout.
    pub async fn wait_for_closed(&self, count: usize, timeout: Duration) {
        let wait = async {
            while self.closed_count() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .unwrap_or_else(|_| panic!("expected {} closed ingest sockets", count));
    }
}

impl Drop for MockIngestServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

async fn upgrade(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<IngestState>,
) -> Response {
    state.connections.lock().unwrap().push(params);
    ws.on_upgrade(move |socket| record(socket, state))
}

async fn record(mut socket: WebSocket, state: IngestState) {
    while let Some(message) = socket.recv().await {
        match message {
            Ok(Message::Binary(data)) => state.frames.lock().unwrap().push(data.to_vec()),
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }
    state.closed.fetch_add(1, Ordering::SeqCst);
}
