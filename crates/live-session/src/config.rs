//! Live session configuration.
//!
//! Configuration is loaded from environment variables and handed to session
//! constructors explicitly; nothing reads the environment after start-up.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default pacing between two ingest sends in milliseconds.
pub const DEFAULT_CHUNK_SEND_INTERVAL_MS: u64 = 50;

/// Default capacity of the chunk queue command channel.
pub const DEFAULT_CHUNK_QUEUE_CAPACITY: usize = 1024;

/// Default delay between manifest probes in milliseconds.
pub const DEFAULT_MANIFEST_POLL_INTERVAL_MS: u64 = 1000;

/// Default per-probe timeout in milliseconds.
pub const DEFAULT_MANIFEST_PROBE_TIMEOUT_MS: u64 = 1000;

/// Default settling delay before opening the control socket in milliseconds.
pub const DEFAULT_CONTROL_SETTLE_DELAY_MS: u64 = 500;

/// Default bound on the end call made while stopping a broadcast.
pub const DEFAULT_END_CALL_TIMEOUT_SECS: u64 = 5;

/// Default registry request timeout in seconds.
pub const DEFAULT_REGISTRY_TIMEOUT_SECS: u64 = 10;

/// Category id meaning "all categories".
pub const DEFAULT_CATEGORY_ID: i64 = 1;

/// Live session configuration.
#[derive(Clone)]
pub struct LiveConfig {
    /// Base URL of the session registry HTTP API.
    pub live_api_url: String,

    /// WebSocket URL of the ingest channel.
    pub stream_ws_url: String,

    /// WebSocket URL of the viewer control channel.
    pub viewer_ws_url: String,

    /// Base URL playback manifests are fetched from (usually the HLS proxy).
    pub hls_base_url: String,

    pub chunk_send_interval: Duration,

    pub chunk_queue_capacity: usize,

    pub manifest_poll_interval: Duration,

    /// Per-attempt probe timeout so one slow response cannot stall the cadence.
    pub manifest_probe_timeout: Duration,

    /// Delay before the control socket is opened after joining.
    pub control_settle_delay: Duration,

    pub end_call_timeout: Duration,

    pub registry_timeout: Duration,
}

impl fmt::Debug for LiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveConfig")
            .field("live_api_url", &self.live_api_url)
            .field("stream_ws_url", &self.stream_ws_url)
            .field("viewer_ws_url", &self.viewer_ws_url)
            .field("hls_base_url", &self.hls_base_url)
            .field("chunk_send_interval_ms", &self.chunk_send_interval.as_millis())
            .field("chunk_queue_capacity", &self.chunk_queue_capacity)
            .field(
                "manifest_poll_interval_ms",
                &self.manifest_poll_interval.as_millis(),
            )
            .field(
                "manifest_probe_timeout_ms",
                &self.manifest_probe_timeout.as_millis(),
            )
            .field(
                "control_settle_delay_ms",
                &self.control_settle_delay.as_millis(),
            )
            .field("end_call_timeout_secs", &self.end_call_timeout.as_secs())
            .field("registry_timeout_secs", &self.registry_timeout.as_secs())
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid URL configuration: {0}")]
    InvalidUrl(String),

    #[error("Invalid numeric configuration: {0}")]
    InvalidNumber(String),
}

impl LiveConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let live_api_url = required_url(vars, "LIVE_API_URL", &["http://", "https://"])?;
        let stream_ws_url = required_url(vars, "STREAM_WS_URL", &["ws://", "wss://"])?;
        let viewer_ws_url = required_url(vars, "VIEWER_WS_URL", &["ws://", "wss://"])?;
        let hls_base_url = required_url(vars, "HLS_BASE_URL", &["http://", "https://"])?;

        let chunk_send_interval = Duration::from_millis(positive(
            vars,
            "CHUNK_SEND_INTERVAL_MS",
            DEFAULT_CHUNK_SEND_INTERVAL_MS,
        )?);

        let chunk_queue_capacity = usize::try_from(positive(
            vars,
            "CHUNK_QUEUE_CAPACITY",
            DEFAULT_CHUNK_QUEUE_CAPACITY as u64,
        )?)
        .map_err(|e| {
            ConfigError::InvalidNumber(format!("CHUNK_QUEUE_CAPACITY is too large: {}", e))
        })?;

        let manifest_poll_interval = Duration::from_millis(positive(
            vars,
            "MANIFEST_POLL_INTERVAL_MS",
            DEFAULT_MANIFEST_POLL_INTERVAL_MS,
        )?);

        let manifest_probe_timeout = Duration::from_millis(positive(
            vars,
            "MANIFEST_PROBE_TIMEOUT_MS",
            DEFAULT_MANIFEST_PROBE_TIMEOUT_MS,
        )?);

        let control_settle_delay = Duration::from_millis(positive(
            vars,
            "CONTROL_SETTLE_DELAY_MS",
            DEFAULT_CONTROL_SETTLE_DELAY_MS,
        )?);

        let end_call_timeout = Duration::from_secs(positive(
            vars,
            "END_CALL_TIMEOUT_SECS",
            DEFAULT_END_CALL_TIMEOUT_SECS,
        )?);

        let registry_timeout = Duration::from_secs(positive(
            vars,
            "REGISTRY_TIMEOUT_SECS",
            DEFAULT_REGISTRY_TIMEOUT_SECS,
        )?);

        Ok(LiveConfig {
            live_api_url,
            stream_ws_url,
            viewer_ws_url,
            hls_base_url,
            chunk_send_interval,
            chunk_queue_capacity,
            manifest_poll_interval,
            manifest_probe_timeout,
            control_settle_delay,
            end_call_timeout,
            registry_timeout,
        })
    }

    /// Playback manifest URL for a stream.
    #[must_use]
    pub fn manifest_url(&self, stream_key: &common::StreamKey) -> String {
        format!("{}/{}.m3u8", self.hls_base_url, stream_key)
    }
}

fn required_url(
    vars: &HashMap<String, String>,
    name: &str,
    schemes: &[&str],
) -> Result<String, ConfigError> {
    let value = vars
        .get(name)
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))?;

    if !schemes.iter().any(|scheme| value.starts_with(scheme)) {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must start with one of {:?}, got '{}'",
            name, schemes, value
        )));
    }

    Ok(value.trim_end_matches('/').to_string())
}

fn positive(vars: &HashMap<String, String>, name: &str, default: u64) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidNumber(format!(
            "{} must be a valid positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidNumber(format!(
            "{} must be greater than 0",
            name
        )));
    }

    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "LIVE_API_URL".to_string(),
                "http://api.local/live".to_string(),
            ),
            ("STREAM_WS_URL".to_string(), "ws://ingest.local/ws".to_string()),
            ("VIEWER_WS_URL".to_string(), "ws://ingest.local/viewer".to_string()),
            ("HLS_BASE_URL".to_string(), "http://proxy.local/hls/".to_string()),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = LiveConfig::from_vars(&base_vars()).expect("Config should load");

        assert_eq!(config.live_api_url, "http://api.local/live");
        assert_eq!(config.hls_base_url, "http://proxy.local/hls");
        assert_eq!(config.chunk_send_interval, Duration::from_millis(50));
        assert_eq!(config.chunk_queue_capacity, DEFAULT_CHUNK_QUEUE_CAPACITY);
        assert_eq!(config.manifest_poll_interval, Duration::from_secs(1));
        assert_eq!(config.manifest_probe_timeout, Duration::from_secs(1));
        assert_eq!(config.control_settle_delay, Duration::from_millis(500));
        assert_eq!(config.end_call_timeout, Duration::from_secs(5));
        assert_eq!(config.registry_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_from_vars_custom_values() {
        let mut vars = base_vars();
        vars.insert("CHUNK_SEND_INTERVAL_MS".to_string(), "20".to_string());
        vars.insert("CHUNK_QUEUE_CAPACITY".to_string(), "16".to_string());
        vars.insert("MANIFEST_POLL_INTERVAL_MS".to_string(), "250".to_string());
        vars.insert("END_CALL_TIMEOUT_SECS".to_string(), "2".to_string());

        let config = LiveConfig::from_vars(&vars).expect("Config should load");
        assert_eq!(config.chunk_send_interval, Duration::from_millis(20));
        assert_eq!(config.chunk_queue_capacity, 16);
        assert_eq!(config.manifest_poll_interval, Duration::from_millis(250));
        assert_eq!(config.end_call_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_missing_live_api_url() {
        let mut vars = base_vars();
        vars.remove("LIVE_API_URL");
        let result = LiveConfig::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "LIVE_API_URL"));
    }

    #[test]
    fn test_socket_url_requires_ws_scheme() {
        let mut vars = base_vars();
        vars.insert("STREAM_WS_URL".to_string(), "http://ingest.local".to_string());
        let result = LiveConfig::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidUrl(msg)) if msg.contains("STREAM_WS_URL")));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut vars = base_vars();
        vars.insert("CHUNK_SEND_INTERVAL_MS".to_string(), "0".to_string());
        let result = LiveConfig::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidNumber(msg)) if msg.contains("must be greater than 0"))
        );
    }

    #[test]
    fn test_non_numeric_rejected() {
        let mut vars = base_vars();
        vars.insert("MANIFEST_PROBE_TIMEOUT_MS".to_string(), "soon".to_string());
        let result = LiveConfig::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidNumber(msg)) if msg.contains("MANIFEST_PROBE_TIMEOUT_MS"))
        );
    }

    #[test]
    fn test_manifest_url() {
        let config = LiveConfig::from_vars(&base_vars()).unwrap();
        let key = common::StreamKey::new("abc123").unwrap();
        assert_eq!(config.manifest_url(&key), "http://proxy.local/hls/abc123.m3u8");
    }
}
