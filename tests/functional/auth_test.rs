//! Functional tests for inbound API key authentication

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request, StatusCode},
    Router,
};
use byteplus_image_gateway::middleware::auth::AuthLayer;
use serde_json::Value;
use tower::ServiceExt;

fn create_test_app(keys: &[&str]) -> Router {
    Router::new()
        .route("/byteplus-generate", axum::routing::post(|| async { "OK" }))
        .route("/health", axum::routing::get(|| async { "OK" }))
        .layer(AuthLayer::new(keys.iter().map(|key| key.to_string()).collect()))
}

async fn call(app: Router, path: &str, authorization: Option<&str>) -> axum::response::Response {
    let method = if path == "/health" { "GET" } else { "POST" };
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
}

#[tokio::test]
async fn test_valid_bearer_token() {
    let app = create_test_app(&["valid-key-1", "valid-key-2"]);
    let response = call(app, "/byteplus-generate", Some("Bearer valid-key-2")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_valid_key_without_bearer_prefix() {
    let app = create_test_app(&["valid-key-1"]);
    let response = call(app, "/byteplus-generate", Some("valid-key-1")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_key_is_rejected() {
    let app = create_test_app(&["valid-key-1"]);
    let response = call(app, "/byteplus-generate", Some("Bearer nope")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error_kind"], "authentication_error");
    assert_eq!(body["detail"], "Authentication failed: Invalid API key");
}

#[tokio::test]
async fn test_missing_header_is_rejected() {
    let app = create_test_app(&["valid-key-1"]);
    let response = call(app, "/byteplus-generate", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_is_always_open() {
    let app = create_test_app(&["valid-key-1"]);
    let response = call(app, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_no_configured_keys_leaves_gateway_open() {
    let app = create_test_app(&[]);
    let response = call(app, "/byteplus-generate", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = create_test_app(&["", "   "]);
    let response = call(app, "/byteplus-generate", Some("Bearer anything")).await;
    assert_eq!(response.status(), StatusCode::OK);
}
