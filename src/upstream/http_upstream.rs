//! HTTP client for the BytePlus generation API

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::generation::UpstreamPayload;
use crate::response::normalize::{self, UpstreamContent};
use crate::response::{ImageBytes, UpstreamReply};
use crate::upstream::traits::ImageUpstream;

/// Pooled HTTP client shared by all requests
pub struct HttpUpstream {
    client: Client,
    generations_url: String,
    api_key: String,
    fetch_timeout: Duration,
}

impl HttpUpstream {
    /// Create a new upstream client from configuration
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(settings.upstream.connect_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            generations_url: settings.generations_url(),
            api_key: settings.upstream.api_key.clone(),
            fetch_timeout: settings.upstream.single_timeout(),
        })
    }
}

fn content_type(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Body of a rejected call, kept for the error message even when it is not UTF-8
async fn error_body(response: reqwest::Response) -> String {
    match response.bytes().await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => format!("<body unavailable: {}>", e),
    }
}

#[async_trait]
impl ImageUpstream for HttpUpstream {
    async fn generate(&self, payload: &UpstreamPayload, timeout: Duration) -> Result<UpstreamReply> {
        debug!(
            url = %self.generations_url,
            model = %payload.model,
            stream = payload.is_streaming(),
            timeout_secs = timeout.as_secs(),
            "Sending generate request"
        );

        let response = self
            .client
            .post(&self.generations_url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "Upstream rejected generate request");
            return Err(AppError::UpstreamHttp {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        let content = UpstreamContent::from_content_type(content_type(response.headers()).as_deref());

        // event streams are consumed to the end before normalizing
        let body = response.text().await?;

        let reply = normalize::normalize(&content, &body)?;
        debug!(
            images = reply.result.len(),
            generated = reply.result.usage.generated_images,
            "Normalized upstream response"
        );

        Ok(reply)
    }

    async fn fetch_image(&self, url: &str) -> Result<ImageBytes> {
        debug!(url = %url, "Fetching generated image");

        let response = self
            .client
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| AppError::FetchFailed(format!("{}: {}", url, e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AppError::FetchFailed(format!(
                "{} returned status {}",
                url, status
            )));
        }

        let declared_type = content_type(response.headers());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::FetchFailed(format!("{}: {}", url, e)))?;

        Ok(ImageBytes {
            bytes: bytes.to_vec(),
            declared_type,
        })
    }
}
