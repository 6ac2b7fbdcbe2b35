use super::*;
use crate::test_helpers::{MemoryCache, ScriptedSource, test_config};
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use std::time::Duration;
use tower::ServiceExt;

mod system;

/// A fetcher over a scripted source and an in-memory cache
fn create_test_fetcher(source: ScriptedSource) -> (Arc<BlockFetcher>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 500);
    let fetcher = BlockFetcher::with_source(
        config,
        Arc::new(source),
        Arc::new(MemoryCache::default()),
    )
    .unwrap();
    (Arc::new(fetcher), dir)
}

fn router_for(fetcher: &Arc<BlockFetcher>) -> Router {
    let config = Arc::new(fetcher.config().clone());
    create_router(fetcher.clone(), config)
}

async fn send(app: &Router, method: &str, uri: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn json_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).expect("Response should be valid JSON")
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (fetcher, _temp_dir) = create_test_fetcher(ScriptedSource::new());

    let mut config = fetcher.config().clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let fetcher = fetcher.clone();
        let config = config.clone();
        async move { start_api_server(fetcher, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server exited early");

    api_handle.abort();
}

#[tokio::test]
async fn test_api_server_reports_bind_failure() {
    let (fetcher, _temp_dir) = create_test_fetcher(ScriptedSource::new());
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();

    let mut config = fetcher.config().clone();
    config.server.api.bind_address = taken.local_addr().unwrap();

    let result = start_api_server(fetcher, Arc::new(config)).await;

    assert!(matches!(result, Err(crate::Error::Io(_))));
}

#[tokio::test]
async fn test_cors_enabled() {
    let (fetcher, _temp_dir) = create_test_fetcher(ScriptedSource::new());

    let mut config = fetcher.config().clone();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(fetcher, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let (fetcher, _temp_dir) = create_test_fetcher(ScriptedSource::new());

    let mut config = fetcher.config().clone();
    config.server.api.cors_origins = vec!["http://dashboard.local".to_string()];
    let app = create_router(fetcher, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://dashboard.local")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://dashboard.local"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (fetcher, _temp_dir) = create_test_fetcher(ScriptedSource::new());

    let mut config = fetcher.config().clone();
    config.server.api.cors_enabled = false;
    let app = create_router(fetcher, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}
