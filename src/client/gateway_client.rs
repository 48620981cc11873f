//! HTTP client for dashboards and scripts that call the gateway

use reqwest::{header::HeaderMap, Client, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use crate::client::metrics::CallMetrics;
use crate::generation::GenerationRequest;
use crate::response::base64;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cannot connect to gateway: {0}")]
    Connection(String),

    #[error("API Error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Unrecognized response: {0}")]
    UnrecognizedResponse(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl ClientError {
    /// Advice shown to the person who made the request
    pub fn guidance(&self) -> &'static str {
        match self {
            ClientError::Timeout(_) => "Request timed out. The generation is taking too long.",
            ClientError::Connection(_) => {
                "Cannot connect to API server. Please check if the server is running."
            }
            ClientError::Api { status, .. } if *status >= 500 => {
                "The image service failed to complete the request. Try again or simplify the prompt."
            }
            ClientError::Api { .. } => "The request was rejected. Check the prompt and settings.",
            ClientError::UnrecognizedResponse(_) => {
                "The server answered with data that is neither JSON nor an image."
            }
            ClientError::Transport(_) => "Unexpected network error while contacting the server.",
        }
    }

    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(timeout)
        } else if err.is_connect() {
            ClientError::Connection(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

/// Image served by `/byteplus-generate-image`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub index: usize,
    pub total: usize,
}

impl ReceivedImage {
    pub fn to_data_url(&self) -> String {
        base64::create_data_url(&self.bytes, &self.content_type)
    }
}

/// What a successful call produced, decided from the content type
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayResponse {
    Json(Value),
    Image(ReceivedImage),
}

fn header_number(headers: &HeaderMap, name: &str, default: usize) -> usize {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

/// Classify a 200 response body. Anything that is neither JSON nor an image is an error.
pub fn classify(headers: &HeaderMap, bytes: Vec<u8>) -> Result<GatewayResponse, ClientError> {
    let content_type = headers
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        let value = serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::UnrecognizedResponse(format!("invalid JSON: {}", e)))?;
        return Ok(GatewayResponse::Json(value));
    }

    if content_type.starts_with("image/") {
        let mime = content_type.split(';').next().unwrap_or("image/png").trim().to_string();
        return Ok(GatewayResponse::Image(ReceivedImage {
            bytes,
            content_type: mime,
            index: header_number(headers, "x-image-index", 0),
            total: header_number(headers, "x-total-images", 1),
        }));
    }

    let shown = if content_type.is_empty() { "<missing>" } else { content_type.as_str() };
    Err(ClientError::UnrecognizedResponse(format!("content type {}", shown)))
}

/// Client for the gateway's generation endpoints
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    single_timeout: Duration,
    sequential_timeout: Duration,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder()
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            single_timeout: Duration::from_secs(120),
            sequential_timeout: Duration::from_secs(300),
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeouts(mut self, single: Duration, sequential: Duration) -> Self {
        self.single_timeout = single;
        self.sequential_timeout = sequential;
        self
    }

    pub fn timeout_for(&self, request: &GenerationRequest) -> Duration {
        if request.is_sequential() {
            self.sequential_timeout
        } else {
            self.single_timeout
        }
    }

    /// POST /byteplus-generate
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        metrics: &mut CallMetrics,
    ) -> Result<GatewayResponse, ClientError> {
        self.send("/byteplus-generate", None, request, metrics).await
    }

    /// POST /byteplus-generate-image?image_index=N
    pub async fn generate_image(
        &self,
        request: &GenerationRequest,
        image_index: usize,
        metrics: &mut CallMetrics,
    ) -> Result<GatewayResponse, ClientError> {
        self.send("/byteplus-generate-image", Some(image_index), request, metrics)
            .await
    }

    async fn send(
        &self,
        path: &str,
        image_index: Option<usize>,
        request: &GenerationRequest,
        metrics: &mut CallMetrics,
    ) -> Result<GatewayResponse, ClientError> {
        let timeout = self.timeout_for(request);
        let started = Instant::now();

        let mut builder = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(request)
            .timeout(timeout);
        if let Some(index) = image_index {
            builder = builder.query(&[("image_index", index)]);
        }
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let outcome = async {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, headers, bytes.to_vec()))
        }
        .await;

        let latency = started.elapsed();
        let (status, headers, bytes) = match outcome {
            Ok(parts) => parts,
            Err(e) => {
                metrics.record_call(false, latency);
                return Err(ClientError::from_reqwest(e, timeout));
            }
        };

        metrics.record_call(status == StatusCode::OK, latency);
        debug!(path, status = status.as_u16(), latency_ms = latency.as_millis() as u64, "Gateway call finished");

        if status != StatusCode::OK {
            return Err(ClientError::Api {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        classify(&headers, bytes)
    }
}
