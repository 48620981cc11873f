//! Seam between the facade and the image generation API

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::generation::UpstreamPayload;
use crate::response::{ImageBytes, UpstreamReply};

/// Trait for the image generation API
#[async_trait]
pub trait ImageUpstream: Send + Sync {
    /// Issue one generation call and normalize whatever comes back
    async fn generate(&self, payload: &UpstreamPayload, timeout: Duration) -> Result<UpstreamReply>;

    /// Download a generated image by URL
    async fn fetch_image(&self, url: &str) -> Result<ImageBytes>;
}
