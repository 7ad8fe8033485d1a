//! Test server harness for E2E testing
//!
//! Provides `TestProxyServer` for spawning the real HLS proxy in tests.

use hls_proxy::config::ProxyConfig;
use hls_proxy::routes::{self, init_metrics_recorder, AppState};
use hls_proxy::services::OriginClient;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// The global recorder can only be installed once per process.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the HLS proxy in E2E tests.
///
/// # Example
/// ```rust,ignore
/// let origin = wiremock::MockServer::start().await;
/// let proxy = TestProxyServer::spawn(&format!("{}/hls", origin.uri())).await?;
///
/// let response = reqwest::get(format!("{}/abc123.m3u8", proxy.hls_base_url())).await?;
/// ```
pub struct TestProxyServer {
    addr: SocketAddr,
    config: ProxyConfig,
    _handle: JoinHandle<()>,
}

impl TestProxyServer {
    /// Spawn a proxy in front of `origin_url`, bound to a random port.
    pub async fn spawn(origin_url: &str) -> Result<Self, anyhow::Error> {
        let vars = HashMap::from([
            ("HLS_ORIGIN_URL".to_string(), origin_url.to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("UPSTREAM_TIMEOUT_SECS".to_string(), "2".to_string()),
        ]);

        let config = ProxyConfig::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let origin = OriginClient::new(config.origin_url.clone(), config.upstream_timeout)
            .map_err(|e| anyhow::anyhow!("Failed to create origin client: {}", e))?;

        let state = Arc::new(AppState {
            config: config.clone(),
            origin,
        });
        let app = routes::build_routes(state, metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test proxy: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test proxy error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Base URL of the proxy.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Base URL players use for manifests, i.e. `{url}/hls`.
    pub fn hls_base_url(&self) -> String {
        format!("{}/hls", self.url())
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

impl Drop for TestProxyServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_proxy_spawns_and_answers_health() -> Result<(), anyhow::Error> {
        let proxy = TestProxyServer::spawn("http://127.0.0.1:9/hls").await?;

        assert!(proxy.url().starts_with("http://127.0.0.1:"));
        assert!(proxy.addr().port() > 0);
        assert_eq!(proxy.hls_base_url(), format!("{}/hls", proxy.url()));

        let response = reqwest::get(format!("{}/health", proxy.url())).await?;
        assert_eq!(response.status(), 200);

        Ok(())
    }
}
