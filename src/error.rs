//! Common error types for the image gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Image index {index} out of range. Valid range: 0-{}", total.saturating_sub(1))]
    OutOfRange { index: usize, total: usize },

    #[error("Upstream request failed with status code {status}: {body}")]
    UpstreamHttp { status: u16, body: String },

    #[error("Unexpected upstream content type: {0}")]
    UnexpectedContentType(String),

    #[error("Malformed upstream response: {0}")]
    MalformedUpstream(String),

    #[error("Upstream returned no image: {0}")]
    EmptyResult(String),

    #[error("Upstream request timed out: {0}")]
    Timeout(String),

    #[error("Cannot connect to upstream: {0}")]
    ConnectionError(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Failed to fetch image: {0}")]
    FetchFailed(String),

    #[error("Failed to decode image data: {0}")]
    DecodeFailed(String),

    #[error("Invalid image data: {0}")]
    InvalidImageData(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else if err.is_connect() {
            AppError::ConnectionError(err.to_string())
        } else {
            AppError::HttpClient(err.to_string())
        }
    }
}

impl AppError {
    /// Stable machine-readable name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::NotFound(_) => "not_found",
            AppError::OutOfRange { .. } => "out_of_range",
            AppError::UpstreamHttp { .. } => "upstream_http_error",
            AppError::UnexpectedContentType(_) => "unexpected_content_type",
            AppError::MalformedUpstream(_) => "malformed_upstream_response",
            AppError::EmptyResult(_) => "empty_result",
            AppError::Timeout(_) => "timeout",
            AppError::ConnectionError(_) => "connection_error",
            AppError::HttpClient(_) => "http_client_error",
            AppError::FetchFailed(_) => "fetch_failed",
            AppError::DecodeFailed(_) => "decode_failed",
            AppError::InvalidImageData(_) => "invalid_image_data",
            AppError::AuthenticationFailed(_) => "authentication_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::OutOfRange { .. } => StatusCode::BAD_REQUEST,
            AppError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ConnectionError(_) | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body returned to callers
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub error_kind: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse {
            detail: self.to_string(),
            error_kind: self.kind().to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
