//! Integration tests for hook management and invocation over HTTP.
//!
//! Drives the full router with `tower::ServiceExt::oneshot`; no auth is
//! configured unless a test says otherwise.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::CONTENT_LENGTH, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use webhookd_api::{create_router, AppState};
use webhookd_auth::{AuthConfig, AuthGate};
use webhookd_core::{Clock, HookRegistry, HookService, TestClock};

fn test_app() -> Router {
    let clock: Arc<dyn Clock> = Arc::new(TestClock::new());
    let hooks = HookService::new(Arc::new(HookRegistry::new()), clock.clone());
    let gate = AuthGate::new(&AuthConfig::default()).expect("auth gate");
    create_router(AppState::new(hooks, gate, clock))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request build"),
        None => builder.body(Body::empty()).expect("request build"),
    };

    app.clone().oneshot(request).await.expect("request execution")
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body extraction");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json deserialization")
}

async fn create_hook(app: &Router, body: Value) -> (String, String) {
    let response = send(app, Method::POST, "/v1/webhooks", Some(body)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    (json["id"].as_str().expect("id").to_string(), json["path"].as_str().expect("path").to_string())
}

#[tokio::test]
async fn hello_hook_lifecycle() {
    let app = test_app();
    let (id, path) = create_hook(&app, json!({ "method": "GET", "body": "hello" })).await;
    assert_eq!(path, format!("/v1/hooks/{id}"));

    let response = send(&app, Method::GET, &path, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "hello");

    let response = send(&app, Method::POST, &path, None).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_json(response).await["error"]["code"], "method_not_allowed");

    let response = send(&app, Method::DELETE, &format!("/v1/webhooks/{id}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "message": "deactivated", "id": id }));

    let response = send(&app, Method::GET, &path, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invocation_counter_shows_in_route_listing() {
    let app = test_app();
    let (id, path) = create_hook(&app, json!({ "method": "put", "body": "" })).await;

    send(&app, Method::PUT, &path, None).await;
    send(&app, Method::PUT, &path, None).await;
    send(&app, Method::GET, &path, None).await;

    let listing = body_json(send(&app, Method::GET, "/v1/debug/routes", None).await).await;
    let hook = &listing["hooks"][&id];

    assert_eq!(hook["method"], "PUT");
    assert_eq!(hook["counter"], 2);
    assert_eq!(hook["active"], true);
    assert_eq!(listing["routes"].as_array().map(Vec::len), Some(10));
}

#[tokio::test]
async fn stored_headers_are_replayed_without_duplicate_content_length() {
    let app = test_app();
    let (_id, path) = create_hook(
        &app,
        json!({
            "method": "POST",
            "body": "{\"ok\":true}",
            "headers": { "Content-Type": "application/json", "Content-Length": "999", "X-Env": "test" }
        }),
    )
    .await;

    let response = send(&app, Method::POST, &path, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(response.headers()["x-env"], "test");
    let lengths: Vec<_> = response.headers().get_all(CONTENT_LENGTH).iter().collect();
    assert!(lengths.len() <= 1);
    assert!(lengths.iter().all(|value| *value == "11"));
    assert_eq!(body_text(response).await, "{\"ok\":true}");
}

#[tokio::test]
async fn empty_method_defaults_to_get() {
    let app = test_app();
    let (_id, path) = create_hook(&app, json!({ "body": "default" })).await;

    let response = send(&app, Method::GET, &path, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unsupported_method_is_rejected() {
    let app = test_app();
    let response =
        send(&app, Method::POST, "/v1/webhooks", Some(json!({ "method": "TRACE", "body": "" }))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "unsupported_method");
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let app = test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/webhooks")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .expect("request build");

    let response = app.oneshot(request).await.expect("request execution");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "bad_request");
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = test_app();

    let response = send(&app, Method::GET, "/v1/hooks/does-not-exist", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, Method::DELETE, "/v1/webhooks/does-not-exist", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["message"], "not found");
}

#[tokio::test]
async fn health_reports_hook_count() {
    let app = test_app();
    create_hook(&app, json!({ "method": "GET", "body": "" })).await;

    let response = send(&app, Method::GET, "/healthz", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["hooks"], 1);
    assert_eq!(json["auth_configured"], false);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = test_app();

    let response = send(&app, Method::GET, "/healthz", None).await;
    let generated = response.headers().get("x-request-id").expect("request id header");
    assert!(!generated.is_empty());

    let request = Request::builder()
        .uri("/healthz")
        .header("x-request-id", "caller-chosen")
        .body(Body::empty())
        .expect("request build");
    let response = app.oneshot(request).await.expect("request execution");
    assert_eq!(response.headers()["x-request-id"], "caller-chosen");
}
