//! Configuration and credential builders.

use common::Credential;
use live_session::LiveConfig;
use std::collections::HashMap;
use uuid::Uuid;

/// Endpoints a test session talks to.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub live_api_url: String,
    pub stream_ws_url: String,
    pub viewer_ws_url: String,
    pub hls_base_url: String,
}

/// Environment for a fast-ticking session: 10ms chunk pacing, 100ms
/// manifest polls, 20ms control settle delay and a 2s end-call bound.
pub fn fast_vars(endpoints: &Endpoints) -> HashMap<String, String> {
    HashMap::from([
        ("LIVE_API_URL".to_string(), endpoints.live_api_url.clone()),
        ("STREAM_WS_URL".to_string(), endpoints.stream_ws_url.clone()),
        ("VIEWER_WS_URL".to_string(), endpoints.viewer_ws_url.clone()),
        ("HLS_BASE_URL".to_string(), endpoints.hls_base_url.clone()),
        ("CHUNK_SEND_INTERVAL_MS".to_string(), "10".to_string()),
        ("MANIFEST_POLL_INTERVAL_MS".to_string(), "100".to_string()),
        ("MANIFEST_PROBE_TIMEOUT_MS".to_string(), "100".to_string()),
        ("CONTROL_SETTLE_DELAY_MS".to_string(), "20".to_string()),
        ("END_CALL_TIMEOUT_SECS".to_string(), "2".to_string()),
        ("REGISTRY_TIMEOUT_SECS".to_string(), "2".to_string()),
    ])
}

/// A [`LiveConfig`] built from [`fast_vars`].
pub fn fast_config(endpoints: &Endpoints) -> LiveConfig {
    LiveConfig::from_vars(&fast_vars(endpoints)).expect("test endpoints form a valid config")
}

/// Endpoints that refuse every connection; for tests that never reach them.
pub fn unreachable_endpoints() -> Endpoints {
    Endpoints {
        live_api_url: "http://127.0.0.1:9/api/live".to_string(),
        stream_ws_url: "ws://127.0.0.1:9/ws".to_string(),
        viewer_ws_url: "ws://127.0.0.1:9/viewer".to_string(),
        hls_base_url: "http://127.0.0.1:9/hls".to_string(),
    }
}

/// Broadcaster credential with a fresh principal id.
pub fn broadcaster() -> Credential {
    Credential::broadcaster(Uuid::new_v4().to_string())
}

/// Viewer credential with a fresh principal id.
pub fn viewer() -> Credential {
    Credential::viewer(Uuid::new_v4().to_string())
}
