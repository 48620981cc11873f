//! Direct image delivery: pick one generated image and serve its raw bytes

use axum::{
    http::{header, HeaderName},
    response::{IntoResponse, Response},
};
use image::ImageFormat;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::response::{base64, CanonicalImage, GenerationResult, ImageSource};
use crate::upstream::ImageUpstream;

pub const HEADER_IMAGE_INDEX: HeaderName = HeaderName::from_static("x-image-index");
pub const HEADER_TOTAL_IMAGES: HeaderName = HeaderName::from_static("x-total-images");

/// Raw image bytes together with the MIME type their source claimed, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBytes {
    pub bytes: Vec<u8>,
    pub declared_type: Option<String>,
}

/// A validated image ready to be written as the response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub index: usize,
    pub total: usize,
}

impl DirectImage {
    pub fn filename(&self) -> String {
        format!("generated_image_{}.png", self.index)
    }
}

impl IntoResponse for DirectImage {
    fn into_response(self) -> Response {
        let headers = [
            (header::CONTENT_TYPE, self.content_type.clone()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename={}", self.filename()),
            ),
            (header::CACHE_CONTROL, "no-cache".to_string()),
            (HEADER_IMAGE_INDEX, self.index.to_string()),
            (HEADER_TOTAL_IMAGES, self.total.to_string()),
        ];

        (headers, self.bytes).into_response()
    }
}

/// Bounds-checked lookup. An empty result is `NotFound` whatever the index.
pub fn select_image(result: &GenerationResult, index: usize) -> Result<&CanonicalImage> {
    if result.is_empty() {
        return Err(AppError::NotFound("No images were generated".to_string()));
    }

    result.images.get(index).ok_or(AppError::OutOfRange {
        index,
        total: result.len(),
    })
}

/// Fully decode the bytes so corrupt data is never served
pub fn validate_image(bytes: &[u8]) -> Result<ImageFormat> {
    if bytes.is_empty() {
        return Err(AppError::InvalidImageData("image data is empty".to_string()));
    }

    let format = image::guess_format(bytes)
        .map_err(|e| AppError::InvalidImageData(format!("unrecognized image format: {}", e)))?;

    image::load_from_memory_with_format(bytes, format)
        .map_err(|e| AppError::InvalidImageData(format!("image failed to decode: {}", e)))?;

    Ok(format)
}

/// Declared `image/*` type first, then the sniffed format, then PNG
pub fn resolve_content_type(declared: Option<&str>, sniffed: Option<ImageFormat>) -> String {
    declared
        .map(|value| value.split(';').next().unwrap_or(value).trim())
        .filter(|mime| mime.starts_with("image/"))
        .map(str::to_string)
        .or_else(|| sniffed.map(|format| format.to_mime_type().to_string()))
        .unwrap_or_else(|| "image/png".to_string())
}

async fn load_bytes(image: &CanonicalImage, upstream: &dyn ImageUpstream) -> Result<ImageBytes> {
    match &image.source {
        ImageSource::Url(url) => upstream.fetch_image(url).await,
        ImageSource::Base64(encoded) => Ok(ImageBytes {
            bytes: base64::decode(encoded)?,
            declared_type: base64::declared_mime(encoded).map(str::to_string),
        }),
    }
}

/// Resolve image `index` of `result` into validated bytes with pagination metadata
pub async fn respond(
    result: &GenerationResult,
    index: usize,
    upstream: &dyn ImageUpstream,
) -> Result<DirectImage> {
    let image = select_image(result, index)?;
    let ImageBytes { bytes, declared_type } = load_bytes(image, upstream).await?;

    // decoding a 4K image is CPU bound
    let (bytes, format) = tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, ImageFormat)> {
        let format = validate_image(&bytes)?;
        Ok((bytes, format))
    })
    .await
    .map_err(|e| AppError::Internal(format!("image validation task failed: {}", e)))??;

    let content_type = resolve_content_type(declared_type.as_deref(), Some(format));
    debug!(index, total = result.len(), size = bytes.len(), content_type = %content_type, "Serving image");

    Ok(DirectImage {
        bytes,
        content_type,
        index,
        total: result.len(),
    })
}
