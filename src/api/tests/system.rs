use super::*;

#[tokio::test]
async fn test_health_endpoint() {
    let (fetcher, _temp_dir) = create_test_fetcher(ScriptedSource::new());
    let app = router_for(&fetcher);

    let response = send(&app, "GET", "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let (fetcher, _temp_dir) = create_test_fetcher(ScriptedSource::new());
    let app = router_for(&fetcher);

    let response = send(&app, "GET", "/openapi.json").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["info"]["title"], "eth-fetcher REST API");
    assert!(body["paths"]["/request"].is_object());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (fetcher, _temp_dir) = create_test_fetcher(ScriptedSource::new());
    let app = router_for(&fetcher);

    let response = send(&app, "GET", "/downloads").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
