//! REST routing through the full router.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use skein_config::HttpConfig;
use skein_core::{App, MemoryService};
use skein_web::HttpProvider;
use std::sync::Arc;
use tower::ServiceExt;

fn router_with(settings: HttpConfig) -> (App, Router) {
    let app = App::new();
    app.register("items", MemoryService::new()).unwrap();
    let provider = Arc::new(HttpProvider::new(&settings));
    app.add_provider(provider.clone());
    let router = provider.router(&app);
    (app, router)
}

fn router() -> (App, Router) {
    router_with(HttpConfig::default())
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, value)
}

#[tokio::test]
async fn test_create_then_get_missing() {
    let (_app, router) = router();

    let (status, created) = send(&router, "POST", "/items", Some(json!({ "text": "hi" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["text"], json!("hi"));
    assert!(created["id"].is_string());

    let (status, error) = send(&router, "GET", "/items/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["name"], json!("NotFound"));
    assert_eq!(error["code"], json!(404));
    assert_eq!(error["className"], json!("not-found"));
}

#[tokio::test]
async fn test_full_crud_cycle() {
    let (_app, router) = router();

    send(&router, "POST", "/items", Some(json!({ "id": "a", "n": 1, "tag": "x" }))).await;
    send(&router, "POST", "/items", Some(json!({ "id": "b", "n": 2, "tag": "y" }))).await;

    let (status, found) = send(&router, "GET", "/items?tag=y", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found, json!([{ "id": "b", "n": 2, "tag": "y" }]));

    let (_, patched) = send(&router, "PATCH", "/items/a", Some(json!({ "n": 5 }))).await;
    assert_eq!(patched, json!({ "id": "a", "n": 5, "tag": "x" }));

    let (_, updated) = send(&router, "PUT", "/items/a", Some(json!({ "n": 6 }))).await;
    assert_eq!(updated, json!({ "n": 6, "id": "a" }));

    let (status, removed) = send(&router, "DELETE", "/items/a", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["id"], json!("a"));

    let (status, _) = send(&router, "GET", "/items/a", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unmapped_verb_is_method_not_allowed() {
    let (_app, router) = router();
    let (status, error) = send(&router, "OPTIONS", "/items", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(error["className"], json!("method-not-allowed"));
}

#[tokio::test]
async fn test_invalid_body_is_bad_request() {
    let (_app, router) = router();
    let request = Request::builder()
        .method("POST")
        .uri("/items")
        .body(Body::from("{not json"))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_service_is_not_found() {
    let (_app, router) = router();
    let (status, error) = send(&router, "GET", "/nothing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["className"], json!("not-found"));
}

#[tokio::test]
async fn test_static_dir_serves_unknown_paths() {
    let temp = tempfile::TempDir::new().unwrap();
    std::fs::write(temp.path().join("index.html"), "<h1>skein</h1>").unwrap();
    std::fs::write(temp.path().join("app.js"), "console.log(1)").unwrap();

    let (_app, router) = router_with(HttpConfig {
        static_dir: Some(temp.path().to_path_buf()),
        ..HttpConfig::default()
    });

    let (status, body) = send(&router, "GET", "/app.js", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("console.log(1)"));

    let (status, body) = send(&router, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("<h1>skein</h1>"));

    let (status, _) = send(&router, "GET", "/items", None).await;
    assert_eq!(status, StatusCode::OK);
}
