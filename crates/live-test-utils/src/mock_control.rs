//! Mock viewer control WebSocket server.
//!
//! Accepts viewer sockets on `/viewer` and forwards every pushed text
//! message to all connected sockets.

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
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

#[derive(Clone)]
struct ControlState {
    outbound: broadcast::Sender<String>,
    connections: Arc<Mutex<Vec<HashMap<String, String>>>>,
    live: Arc<AtomicUsize>,
}

/// In-process viewer control endpoint.
pub struct MockControlServer {
    addr: SocketAddr,
    state: ControlState,
    _handle: JoinHandle<()>,
}

impl MockControlServer {
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        let (outbound, _) = broadcast::channel(16);
        let state = ControlState {
            outbound,
            connections: Arc::new(Mutex::new(Vec::new())),
            live: Arc::new(AtomicUsize::new(0)),
        };
        let app = Router::new()
            .route("/viewer", get(upgrade))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind mock control: {}", e))?;
        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Mock control error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// URL to configure as `VIEWER_WS_URL`.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/viewer", self.addr)
    }

    /// Send `text` to every connected socket. Returns how many received it.
    pub fn push(&self, text: &str) -> usize {
        self.state.outbound.send(text.to_string()).unwrap_or(0)
    }

    /// Query parameters of every accepted connection.
    pub fn connections(&self) -> Vec<HashMap<String, String>> {
        self.state.connections.lock().unwrap().clone()
    }

    /// Sockets currently open.
    pub fn live_count(&self) -> usize {
        self.state.live.load(Ordering::SeqCst)
    }

    /// Poll until at least `count` sockets are open. Panics on timeout.
    pub async fn wait_for_live(&self, count: usize, timeout: Duration) {
        let wait = async {
            while self.live_count() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .unwrap_or_else(|_| panic!("expected {} live control sockets", count));
    }
}

impl Drop for MockControlServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

async fn upgrade(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<ControlState>,
) -> Response {
    state.connections.lock().unwrap().push(params);
    ws.on_upgrade(move |socket| serve(socket, state))
}

async fn serve(mut socket: WebSocket, state: ControlState) {
    // Subscribe before counting the socket live so no push is missed.
    let mut outbound = state.outbound.subscribe();
    state.live.fetch_add(1, Ordering::SeqCst);

    loop {
        tokio::select! {
            pushed = outbound.recv() => match pushed {
                Ok(text) => {
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    state.live.fetch_sub(1, Ordering::SeqCst);
}
