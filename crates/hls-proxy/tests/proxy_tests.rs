//! Proxy integration tests.
//!
//! Drives the real router against a wiremock HLS origin.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use hls_proxy::config::ProxyConfig;
use hls_proxy::routes::{self, init_metrics_recorder, AppState};
use hls_proxy::services::OriginClient;
use http_body_util::BodyExt;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Global metrics handle for test routers
static TEST_METRICS_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> =
    OnceLock::new();

fn get_test_metrics_handle() -> metrics_exporter_prometheus::PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder().unwrap_or_else(|_| {
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .build_recorder()
                    .handle()
            })
        })
        .clone()
}

fn app_for_origin(origin_url: &str) -> Router {
    let vars = HashMap::from([("HLS_ORIGIN_URL".to_string(), origin_url.to_string())]);
    let config = ProxyConfig::from_vars(&vars).expect("valid config");
    let origin = OriginClient::new(config.origin_url.clone(), config.upstream_timeout)
        .expect("origin client builds");
    let state = Arc::new(AppState { config, origin });
    routes::build_routes(state, get_test_metrics_handle())
}

async fn get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

fn assert_cors(response: &axum::response::Response) {
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
        "GET, OPTIONS"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
        "Content-Type"
    );
}

#[tokio::test]
async fn test_manifest_forwarded_from_exact_upstream_path() -> Result<()> {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hls/a/b.m3u8"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/x-mpegURL")
                .set_body_string("#EXTM3U\n#EXT-X-VERSION:3\n"),
        )
        .expect(1)
        .mount(&origin)
        .await;

    let app = app_for_origin(&format!("{}/hls", origin.uri()));
    let response = get(app, "/hls/a/b.m3u8").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors(&response);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/x-mpegURL"
    );
    assert_eq!(body_bytes(response).await, b"#EXTM3U\n#EXT-X-VERSION:3\n");

    let received = origin.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received.first().unwrap().url.path(), "/hls/a/b.m3u8");
    Ok(())
}

#[tokio::test]
async fn test_segment_bytes_forwarded_exactly() -> Result<()> {
    let origin = MockServer::start().await;
    let segment: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    Mock::given(method("GET"))
        .and(path("/hls/abc123/seg_001.ts"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "video/mp2t")
                .set_body_bytes(segment.clone()),
        )
        .mount(&origin)
        .await;

    let app = app_for_origin(&format!("{}/hls", origin.uri()));
    let response = get(app, "/hls/abc123/seg_001.ts").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "video/mp2t"
    );
    assert_eq!(body_bytes(response).await, segment);
    Ok(())
}

#[tokio::test]
async fn test_missing_content_type_defaults_to_manifest_type() -> Result<()> {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hls/abc123.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"#EXTM3U\n".to_vec()))
        .mount(&origin)
        .await;

    let app = app_for_origin(&format!("{}/hls", origin.uri()));
    let response = get(app, "/hls/abc123.m3u8").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/vnd.apple.mpegurl"
    );
    Ok(())
}

#[tokio::test]
async fn test_query_string_not_forwarded() -> Result<()> {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hls/abc123.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\n"))
        .mount(&origin)
        .await;

    let app = app_for_origin(&format!("{}/hls", origin.uri()));
    let response = get(app, "/hls/abc123.m3u8?_t=12345").await;

    assert_eq!(response.status(), StatusCode::OK);
    let received = origin.received_requests().await.unwrap();
    assert_eq!(received.first().unwrap().url.query(), None);
    Ok(())
}

#[tokio::test]
async fn test_encoded_question_mark_stays_in_upstream_path() -> Result<()> {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("segment"))
        .mount(&origin)
        .await;

    let app = app_for_origin(&format!("{}/hls", origin.uri()));
    let response = get(app, "/hls/a%3Fb.ts").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors(&response);
    let received = origin.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let request = received.first().unwrap();
    assert_eq!(request.url.path(), "/hls/a%3Fb.ts");
    assert_eq!(request.url.query(), None);
    Ok(())
}

#[tokio::test]
async fn test_non_utf8_escape_is_forwarded_and_keeps_cors() -> Result<()> {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&origin)
        .await;

    let app = app_for_origin(&format!("{}/hls", origin.uri()));
    let response = get(app, "/hls/abc123/%FF.ts").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_cors(&response);
    assert_eq!(body_bytes(response).await, b"Stream not found");

    let received = origin.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received.first().unwrap().url.path(), "/hls/abc123/%FF.ts");
    Ok(())
}

#[tokio::test]
async fn test_upstream_not_found_is_stream_not_found() -> Result<()> {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&origin)
        .await;

    let app = app_for_origin(&format!("{}/hls", origin.uri()));
    let response = get(app, "/hls/a/b.m3u8").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_cors(&response);
    assert_eq!(body_bytes(response).await, b"Stream not found");
    Ok(())
}

#[tokio::test]
async fn test_upstream_server_error_is_also_not_found() -> Result<()> {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&origin)
        .await;

    let app = app_for_origin(&format!("{}/hls", origin.uri()));
    let response = get(app, "/hls/abc123.m3u8").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(response).await, b"Stream not found");
    Ok(())
}

#[tokio::test]
async fn test_unreachable_origin_is_internal_error() -> Result<()> {
    let app = app_for_origin("http://127.0.0.1:9/hls");
    let response = get(app, "/hls/abc123.m3u8").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors(&response);
    assert_eq!(body_bytes(response).await, b"Internal Server Error");
    Ok(())
}

#[tokio::test]
async fn test_preflight_always_succeeds() -> Result<()> {
    // The origin is never contacted for a preflight.
    let app = app_for_origin("http://127.0.0.1:9/hls");

    for uri in ["/hls/anything", "/hls/a/b/c.ts?x=1&y=2"] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(&response);
        assert!(body_bytes(response).await.is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let app = app_for_origin("http://127.0.0.1:9/hls");
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await)?;
    assert_eq!(body, serde_json::json!({"status": "healthy"}));
    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_renders() -> Result<()> {
    let app = app_for_origin("http://127.0.0.1:9/hls");
    let response = get(app, "/metrics").await;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}
