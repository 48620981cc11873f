//! Base64 encoding and decoding utilities

use base64::{engine::general_purpose::STANDARD, Engine};
use crate::error::{AppError, Result};

/// Encode binary data to base64 string
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Strip a `data:<mime>;base64,` prefix if there is one
fn payload(encoded: &str) -> &str {
    if encoded.starts_with("data:") {
        encoded.split_once(',').map(|(_, data)| data).unwrap_or(encoded)
    } else {
        encoded
    }
}

/// Decode base64 string to binary data
pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    let data = payload(encoded);

    // upstream payloads are sometimes line-wrapped
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    STANDARD
        .decode(compact)
        .map_err(|e| AppError::DecodeFailed(format!("Invalid base64 data: {}", e)))
}

/// MIME type declared by a data URL prefix, e.g. `image/png`
pub fn declared_mime(data_url: &str) -> Option<&str> {
    let rest = data_url.strip_prefix("data:")?;
    let end = rest.find(|c: char| c == ';' || c == ',')?;
    let mime = &rest[..end];
    mime.starts_with("image/").then_some(mime)
}

/// Create a data URL from binary image data
pub fn create_data_url(data: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, encode(data))
}
