//! Response handling module - canonical result, normalization and direct image delivery

pub mod base64;
pub mod direct;
pub mod normalize;
pub mod sse;

use serde::Serialize;

pub use direct::{DirectImage, ImageBytes};
pub use normalize::{UpstreamContent, UpstreamReply};

/// Where the bytes of a generated image live
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ImageSource {
    #[serde(rename = "url")]
    Url(String),
    #[serde(rename = "b64_json")]
    Base64(String),
}

/// One generated image. Exactly one of URL or base64 is carried by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalImage {
    #[serde(flatten)]
    pub source: ImageSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl CanonicalImage {
    pub fn from_url(url: impl Into<String>, size: Option<String>) -> Self {
        Self {
            source: ImageSource::Url(url.into()),
            size,
        }
    }

    pub fn from_base64(data: impl Into<String>, size: Option<String>) -> Self {
        Self {
            source: ImageSource::Base64(data.into()),
            size,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match &self.source {
            ImageSource::Url(url) => Some(url),
            ImageSource::Base64(_) => None,
        }
    }

    pub fn base64(&self) -> Option<&str> {
        match &self.source {
            ImageSource::Base64(data) => Some(data),
            ImageSource::Url(_) => None,
        }
    }
}

/// Token accounting reported by the generation API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub generated_images: u32,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    /// Fallback when the upstream did not report usage
    pub fn counted(images: usize) -> Self {
        Self {
            generated_images: u32::try_from(images).unwrap_or(u32::MAX),
            output_tokens: 0,
            total_tokens: 0,
        }
    }
}

/// Canonical result of one generation call, serialized as `{data, usage}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    #[serde(rename = "data")]
    pub images: Vec<CanonicalImage>,
    pub usage: Usage,
}

impl GenerationResult {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// URL of the first image, the only thing the single-image workflows need
    pub fn first_url(&self) -> Option<&str> {
        self.images.first().and_then(CanonicalImage::url)
    }
}
