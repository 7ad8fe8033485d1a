//! HLS proxy configuration.
//!
//! Configuration is loaded from environment variables.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default upstream request timeout in seconds.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// HLS proxy configuration.
#[derive(Clone)]
pub struct ProxyConfig {
    /// Base URL of the HLS origin, without a trailing slash.
    pub origin_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Timeout for one upstream request.
    pub upstream_timeout: Duration,
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("origin_url", &self.origin_url)
            .field("bind_address", &self.bind_address)
            .field("upstream_timeout_secs", &self.upstream_timeout.as_secs())
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid origin URL: {0}")]
    InvalidOriginUrl(String),

    #[error("Invalid upstream timeout: {0}")]
    InvalidUpstreamTimeout(String),
}

impl ProxyConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (useful for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let origin = vars
            .get("HLS_ORIGIN_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("HLS_ORIGIN_URL".to_string()))?;

        if !origin.starts_with("http://") && !origin.starts_with("https://") {
            return Err(ConfigError::InvalidOriginUrl(format!(
                "HLS_ORIGIN_URL must start with http:// or https://, got '{}'",
                origin
            )));
        }
        let origin_url = origin.trim_end_matches('/').to_string();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let upstream_timeout_secs = match vars.get("UPSTREAM_TIMEOUT_SECS") {
            Some(value) => {
                let secs: u64 = value.parse().map_err(|e| {
                    ConfigError::InvalidUpstreamTimeout(format!(
                        "UPSTREAM_TIMEOUT_SECS must be a valid positive integer, got '{}': {}",
                        value, e
                    ))
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidUpstreamTimeout(
                        "UPSTREAM_TIMEOUT_SECS must be greater than 0".to_string(),
                    ));
                }
                secs
            }
            None => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };

        Ok(ProxyConfig {
            origin_url,
            bind_address,
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
        })
    }
}
