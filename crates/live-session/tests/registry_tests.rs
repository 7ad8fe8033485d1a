//! Session registry client integration tests.
//!
//! Drives `HttpSessionRegistry` against a wiremock registry.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use common::{Credential, StreamKey};
use live_session::errors::LiveError;
use live_session::registry::{
    collect_live_sessions, HttpSessionRegistry, LiveListQuery, SessionRegistry, StartRequest,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn registry_for(server: &MockServer) -> HttpSessionRegistry {
    HttpSessionRegistry::new(format!("{}/api/live", server.uri()), Duration::from_secs(2))
        .expect("registry client builds")
}

fn key(value: &str) -> StreamKey {
    StreamKey::new(value).unwrap()
}

#[tokio::test]
async fn test_start_sends_title_category_and_busker_header() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/live/start"))
        .and(header("X-Busker-Id", "busker-7"))
        .and(body_json(json!({ "title": "demo", "categoryId": 3 })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "result": { "streamKey": "abc123" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_for(&server);
    let stream_key = registry
        .start(
            &Credential::broadcaster("busker-7"),
            &StartRequest {
                title: "demo".to_string(),
                category_id: 3,
            },
        )
        .await?;

    assert_eq!(stream_key.as_str(), "abc123");
    Ok(())
}

#[tokio::test]
async fn test_start_rejection_is_start_failed() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/live/start"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let result = registry_for(&server)
        .start(
            &Credential::broadcaster("busker-7"),
            &StartRequest {
                title: "demo".to_string(),
                category_id: 1,
            },
        )
        .await;

    assert!(matches!(result, Err(LiveError::StartFailed(msg)) if msg.contains("409")));
    Ok(())
}

#[tokio::test]
async fn test_start_with_empty_stream_key_is_start_failed() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/live/start"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "result": { "streamKey": "" } })),
        )
        .mount(&server)
        .await;

    let result = registry_for(&server)
        .start(
            &Credential::broadcaster("busker-7"),
            &StartRequest {
                title: "demo".to_string(),
                category_id: 1,
            },
        )
        .await;

    assert!(matches!(result, Err(LiveError::StartFailed(_))));
    Ok(())
}

#[tokio::test]
async fn test_end_sends_stream_key_query() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/live/end"))
        .and(query_param("streamKey", "abc123"))
        .and(header("X-Busker-Id", "busker-7"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    registry_for(&server)
        .end(&Credential::broadcaster("busker-7"), &key("abc123"))
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_end_server_error_is_end_failed() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/live/end"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = registry_for(&server)
        .end(&Credential::broadcaster("busker-7"), &key("abc123"))
        .await;

    assert!(matches!(result, Err(LiveError::EndFailed(_))));
    Ok(())
}

#[tokio::test]
async fn test_enter_returns_title_and_viewer_count() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/live/enter/abc123"))
        .and(header("X-User-Id", "viewer-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "title": "demo", "viewerCount": 42 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entered = registry_for(&server)
        .enter(&Credential::viewer("viewer-1"), &key("abc123"))
        .await?;

    assert_eq!(entered.title, "demo");
    assert_eq!(entered.viewer_count, 42);
    Ok(())
}

#[tokio::test]
async fn test_enter_malformed_body_is_registry_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/live/enter/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = registry_for(&server)
        .enter(&Credential::viewer("viewer-1"), &key("abc123"))
        .await;

    assert!(matches!(result, Err(LiveError::Registry(_))));
    Ok(())
}

#[tokio::test]
async fn test_exit_sends_user_header() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/live/exit"))
        .and(query_param("streamKey", "abc123"))
        .and(header("X-User-Id", "viewer-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    registry_for(&server)
        .exit(&Credential::viewer("viewer-1"), &key("abc123"))
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_end_with_viewer_credential_makes_no_request() -> Result<()> {
    let server = MockServer::start().await;

    let result = registry_for(&server)
        .end(&Credential::viewer("viewer-1"), &key("abc123"))
        .await;

    assert!(matches!(result, Err(LiveError::Validation(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_list_omits_default_category() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/live/all"))
        .and(query_param("size", "10"))
        .and(query_param_is_missing("categoryId"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "content": [], "hasNext": false }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = LiveListQuery {
        cursor: None,
        size: 10,
        category_id: Some(1),
    };
    let page = registry_for(&server).list(&query).await?;

    assert!(page.content.is_empty());
    assert!(!page.has_next);
    Ok(())
}

#[tokio::test]
async fn test_collect_follows_cursor_until_last_page() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/live/all"))
        .and(query_param("categoryId", "4"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "content": [
                    { "streamKey": "k1", "title": "first", "viewerCount": 3, "categoryId": 4 }
                ],
                "hasNext": true,
                "nextCursor": "c1"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/live/all"))
        .and(query_param("categoryId", "4"))
        .and(query_param("cursor", "c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "content": [ { "streamKey": "k2", "title": "second" } ],
                "hasNext": false
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_for(&server);
    let sessions = collect_live_sessions(&registry, 20, Some(4), 10).await?;

    let keys: Vec<&str> = sessions.iter().map(|s| s.stream_key.as_str()).collect();
    assert_eq!(keys, vec!["k1", "k2"]);
    assert_eq!(sessions.first().unwrap().viewer_count, 3);
    assert_eq!(sessions.get(1).unwrap().viewer_count, 0);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_registry_is_start_failed() -> Result<()> {
    let registry = HttpSessionRegistry::new("http://127.0.0.1:9/api/live", Duration::from_secs(1))?;

    let result = registry
        .start(
            &Credential::broadcaster("busker-7"),
            &StartRequest {
                title: "demo".to_string(),
                category_id: 1,
            },
        )
        .await;

    assert!(matches!(result, Err(LiveError::StartFailed(_))));
    Ok(())
}
