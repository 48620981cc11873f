//! Unit tests for direct image delivery

#[path = "../common/mod.rs"]
mod common;

use axum::response::IntoResponse;
use byteplus_image_gateway::error::AppError;
use byteplus_image_gateway::response::base64;
use byteplus_image_gateway::response::direct::{self, select_image};
use byteplus_image_gateway::response::{CanonicalImage, GenerationResult, Usage};
use common::{png_bytes, url_result, StubUpstream};

fn base64_result(encoded: Vec<String>) -> GenerationResult {
    let images: Vec<_> = encoded
        .into_iter()
        .map(|data| CanonicalImage::from_base64(data, Some("2x2".to_string())))
        .collect();
    GenerationResult {
        usage: Usage::counted(images.len()),
        images,
    }
}

#[test]
fn test_index_past_end_is_out_of_range() {
    let result = url_result(&["https://x/a.png", "https://x/b.png"]);

    let err = select_image(&result, 2).unwrap_err();
    assert!(matches!(err, AppError::OutOfRange { index: 2, total: 2 }));
    assert!(err.to_string().contains("0-1"));
    assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
}

#[test]
fn test_empty_result_is_not_found() {
    let result = GenerationResult::default();

    for index in [0, 5] {
        let err = select_image(&result, index).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}

#[tokio::test]
async fn test_base64_png_is_served() {
    let png = png_bytes();
    let result = base64_result(vec![base64::encode(&png)]);
    let upstream = StubUpstream::new();

    let image = direct::respond(&result, 0, &upstream).await.unwrap();
    assert_eq!(image.bytes, png);
    assert_eq!(image.content_type, "image/png");
    assert_eq!(image.index, 0);
    assert_eq!(image.total, 1);
}

#[tokio::test]
async fn test_data_url_is_decoded() {
    let png = png_bytes();
    let result = base64_result(vec![
        "unused".to_string(),
        base64::create_data_url(&png, "image/png"),
    ]);
    let upstream = StubUpstream::new();

    let image = direct::respond(&result, 1, &upstream).await.unwrap();
    assert_eq!(image.bytes, png);
    assert_eq!(image.index, 1);
    assert_eq!(image.total, 2);
}

#[tokio::test]
async fn test_bad_base64_is_decode_failure() {
    let result = base64_result(vec!["%%% not base64 %%%".to_string()]);
    let upstream = StubUpstream::new();

    let err = direct::respond(&result, 0, &upstream).await.unwrap_err();
    assert!(matches!(err, AppError::DecodeFailed(_)));
}

#[tokio::test]
async fn test_non_image_bytes_are_rejected() {
    let result = base64_result(vec![base64::encode(b"<html>not an image</html>")]);
    let upstream = StubUpstream::new();

    let err = direct::respond(&result, 0, &upstream).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidImageData(_)));
}

#[tokio::test]
async fn test_url_image_is_fetched_and_keeps_declared_type() {
    let png = png_bytes();
    let result = url_result(&["https://cdn/a.png", "https://cdn/b.png"]);
    let upstream = StubUpstream::new().image("https://cdn/b.png", png.clone(), Some("image/png"));

    let image = direct::respond(&result, 1, &upstream).await.unwrap();
    assert_eq!(image.bytes, png);
    assert_eq!(image.content_type, "image/png");
    assert_eq!(image.filename(), "generated_image_1.png");
}

#[tokio::test]
async fn test_missing_declared_type_falls_back_to_sniffed_format() {
    let result = url_result(&["https://cdn/a"]);
    let upstream =
        StubUpstream::new().image("https://cdn/a", png_bytes(), Some("application/octet-stream"));

    let image = direct::respond(&result, 0, &upstream).await.unwrap();
    assert_eq!(image.content_type, "image/png");
}

#[tokio::test]
async fn test_fetch_failure_is_reported() {
    let result = url_result(&["https://cdn/gone.png"]);
    let upstream = StubUpstream::new();

    let err = direct::respond(&result, 0, &upstream).await.unwrap_err();
    assert!(matches!(err, AppError::FetchFailed(_)));
    assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_response_headers() {
    let png = png_bytes();
    let result = base64_result(vec![base64::encode(&png), base64::encode(&png)]);
    let upstream = StubUpstream::new();

    let response = direct::respond(&result, 1, &upstream)
        .await
        .unwrap()
        .into_response();

    let headers = response.headers();
    assert_eq!(headers["content-type"], "image/png");
    assert_eq!(headers["content-disposition"], "inline; filename=generated_image_1.png");
    assert_eq!(headers["cache-control"], "no-cache");
    assert_eq!(headers["x-image-index"], "1");
    assert_eq!(headers["x-total-images"], "2");
}
