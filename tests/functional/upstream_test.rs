//! Functional tests for the HTTP upstream client against a mock generation API

use byteplus_image_gateway::config::Settings;
use byteplus_image_gateway::error::AppError;
use byteplus_image_gateway::generation::{GenerationRequest, UpstreamPayload};
use byteplus_image_gateway::upstream::{HttpUpstream, ImageUpstream};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn settings_for(base_url: &str) -> Settings {
    let mut settings = Settings::default();
    settings.upstream.base_url = format!("{}/api/v3", base_url);
    settings.upstream.api_key = "ark-test-key".to_string();
    settings.upstream.connect_timeout_secs = 1;
    settings
}

fn text_payload(prompt: &str) -> UpstreamPayload {
    let request: GenerationRequest = serde_json::from_value(json!({
        "prompt": prompt,
        "sequential_image_generation": "disabled"
    }))
    .unwrap();
    request.build_payload("seedream-test")
}

#[tokio::test]
async fn test_json_reply_is_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/images/generations"))
        .and(header("authorization", "Bearer ark-test-key"))
        .and(body_partial_json(json!({"model": "seedream-test", "prompt": "a cat"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "seedream-test",
            "created": 1757321139,
            "data": [{"url": "https://x/y.png", "size": "512x512"}],
            "usage": {"generated_images": 1, "output_tokens": 4096, "total_tokens": 4096}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let upstream = HttpUpstream::new(&settings_for(&server.uri())).unwrap();
    let reply = upstream
        .generate(&text_payload("a cat"), Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(reply.result.first_url(), Some("https://x/y.png"));
    assert_eq!(reply.result.usage.total_tokens, 4096);
    assert_eq!(reply.raw["created"], 1757321139);
}

#[tokio::test]
async fn test_text_to_image_body_omits_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let upstream = HttpUpstream::new(&settings_for(&server.uri())).unwrap();
    upstream
        .generate(&text_payload("a cat"), Duration::from_secs(5))
        .await
        .unwrap();

    let requests: Vec<Request> = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("image").is_none());
    assert!(body.get("sequential_image_generation_options").is_none());
    assert_eq!(body["response_format"], "url");
}

#[tokio::test]
async fn test_event_stream_reply_is_normalized() {
    let stream = concat!(
        "event: image_generation.partial_succeeded\n",
        "data: {\"type\":\"image_generation.partial_succeeded\",\"image_index\":0,\"url\":\"https://x/0.png\",\"size\":\"2048x2048\"}\n\n",
        "event: image_generation.partial_succeeded\n",
        "data: {\"type\":\"image_generation.partial_succeeded\",\"image_index\":1,\"url\":\"https://x/1.png\",\"size\":\"2048x2048\"}\n\n",
        "event: image_generation.completed\n",
        "data: {\"type\":\"image_generation.completed\",\"usage\":{\"generated_images\":2,\"output_tokens\":32768,\"total_tokens\":32768}}\n\n",
        "data: [DONE]\n\n",
    );

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(stream, "text/event-stream"))
        .mount(&server)
        .await;

    let upstream = HttpUpstream::new(&settings_for(&server.uri())).unwrap();
    let mut payload = text_payload("a story in two panels");
    payload.stream = Some(true);
    let reply = upstream.generate(&payload, Duration::from_secs(5)).await.unwrap();

    let urls: Vec<_> = reply.result.images.iter().filter_map(|image| image.url()).collect();
    assert_eq!(urls, vec!["https://x/0.png", "https://x/1.png"]);
    assert_eq!(reply.result.usage.generated_images, 2);
    assert_eq!(reply.result.usage.output_tokens, 32768);
}

#[tokio::test]
async fn test_non_success_status_is_upstream_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": {"code": "InvalidParameter", "message": "bad size"}})),
        )
        .mount(&server)
        .await;

    let upstream = HttpUpstream::new(&settings_for(&server.uri())).unwrap();
    let err = upstream
        .generate(&text_payload("a cat"), Duration::from_secs(5))
        .await
        .unwrap_err();

    match err {
        AppError::UpstreamHttp { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("InvalidParameter"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unexpected_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .mount(&server)
        .await;

    let upstream = HttpUpstream::new(&settings_for(&server.uri())).unwrap();
    let err = upstream
        .generate(&text_payload("a cat"), Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::UnexpectedContentType(_)));
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": []}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let upstream = HttpUpstream::new(&settings_for(&server.uri())).unwrap();
    let err = upstream
        .generate(&text_payload("a cat"), Duration::from_millis(200))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Timeout(_)));
}

#[tokio::test]
async fn test_unreachable_upstream_is_connection_error() {
    let upstream = HttpUpstream::new(&settings_for("http://127.0.0.1:1")).unwrap();
    let err = upstream
        .generate(&text_payload("a cat"), Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ConnectionError(_)));
}

#[tokio::test]
async fn test_fetch_image() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/images/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3], "image/png"))
        .mount(&server)
        .await;

    let upstream = HttpUpstream::new(&settings_for(&server.uri())).unwrap();
    let image = upstream
        .fetch_image(&format!("{}/images/a.png", server.uri()))
        .await
        .unwrap();

    assert_eq!(image.bytes, vec![1, 2, 3]);
    assert_eq!(image.declared_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_fetch_missing_image_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let upstream = HttpUpstream::new(&settings_for(&server.uri())).unwrap();
    let err = upstream
        .fetch_image(&format!("{}/images/gone.png", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::FetchFailed(_)));
}

#[tokio::test]
async fn test_error_body_that_is_not_utf8_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_raw(vec![b'o', b'v', 0xFF, b'r'], "text/plain"))
        .mount(&server)
        .await;

    let upstream = HttpUpstream::new(&settings_for(&server.uri())).unwrap();
    let err = upstream
        .generate(&text_payload("a cat"), Duration::from_secs(5))
        .await
        .unwrap_err();

    match err {
        AppError::UpstreamHttp { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "ov\u{FFFD}r");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_generate_without_content_is_upstream_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let upstream = HttpUpstream::new(&settings_for(&server.uri())).unwrap();
    let err = upstream
        .generate(&text_payload("a cat"), Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::UpstreamHttp { status: 204, .. }));
}

#[tokio::test]
async fn test_fetch_without_content_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let upstream = HttpUpstream::new(&settings_for(&server.uri())).unwrap();
    let err = upstream
        .fetch_image(&format!("{}/images/empty.png", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::FetchFailed(_)));
}
