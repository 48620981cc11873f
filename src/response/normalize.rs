//! Normalizes upstream JSON bodies and event streams into one `GenerationResult`

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::response::sse::{self, SseEvent};
use crate::response::{CanonicalImage, GenerationResult, Usage};

pub const EVENT_PARTIAL_SUCCEEDED: &str = "image_generation.partial_succeeded";
pub const EVENT_PARTIAL_FAILED: &str = "image_generation.partial_failed";
pub const EVENT_COMPLETED: &str = "image_generation.completed";

/// Body kinds the generation API answers with, decided from the content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamContent {
    Json,
    EventStream,
    Unrecognized(String),
}

impl UpstreamContent {
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return UpstreamContent::Unrecognized("<missing>".to_string());
        };

        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "application/json" => UpstreamContent::Json,
            "text/event-stream" => UpstreamContent::EventStream,
            _ => UpstreamContent::Unrecognized(content_type.to_string()),
        }
    }
}

/// Normalized result plus the upstream body it came from
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamReply {
    pub result: GenerationResult,
    /// The JSON body, or the array of parsed event payloads for streams
    pub raw: Value,
}

/// Dispatch on the body kind; callers never see which strategy ran
pub fn normalize(content: &UpstreamContent, body: &str) -> Result<UpstreamReply> {
    match content {
        UpstreamContent::Json => normalize_json(body),
        UpstreamContent::EventStream => Ok(normalize_event_stream(body)),
        UpstreamContent::Unrecognized(content_type) => {
            Err(AppError::UnexpectedContentType(content_type.clone()))
        }
    }
}

#[derive(Debug, Deserialize)]
struct UpstreamBody {
    #[serde(default)]
    data: Vec<UpstreamImage>,
    #[serde(default)]
    usage: Option<Value>,
}

/// Usage as reported upstream; any field may be missing
#[derive(Debug, Deserialize)]
struct ReportedUsage {
    #[serde(default)]
    generated_images: Option<u32>,
    #[serde(default)]
    output_tokens: Option<u64>,
    #[serde(default)]
    total_tokens: Option<u64>,
}

impl ReportedUsage {
    fn parse(value: &Value) -> std::result::Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Missing counters fall back to the image count and zero tokens
    fn resolve(self, images: usize) -> Usage {
        let counted = Usage::counted(images);
        Usage {
            generated_images: self.generated_images.unwrap_or(counted.generated_images),
            output_tokens: self.output_tokens.unwrap_or(0),
            total_tokens: self.total_tokens.unwrap_or(0),
        }
    }
}

fn resolve_usage(reported: Option<ReportedUsage>, images: usize) -> Usage {
    match reported {
        Some(reported) => reported.resolve(images),
        None => Usage::counted(images),
    }
}

#[derive(Debug, Deserialize)]
struct UpstreamImage {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    size: Option<String>,
}

impl UpstreamImage {
    fn into_canonical(self) -> Option<CanonicalImage> {
        match (self.url, self.b64_json) {
            (Some(url), _) => Some(CanonicalImage::from_url(url, self.size)),
            (None, Some(data)) => Some(CanonicalImage::from_base64(data, self.size)),
            (None, None) => None,
        }
    }
}

/// Non-streaming `{data, usage}` body
pub fn normalize_json(body: &str) -> Result<UpstreamReply> {
    let raw: Value = serde_json::from_str(body)
        .map_err(|e| AppError::MalformedUpstream(format!("invalid JSON body: {}", e)))?;

    let parsed: UpstreamBody = serde_json::from_value(raw.clone())
        .map_err(|e| AppError::MalformedUpstream(format!("unexpected JSON shape: {}", e)))?;

    let mut images = Vec::with_capacity(parsed.data.len());
    for (index, item) in parsed.data.into_iter().enumerate() {
        match item.into_canonical() {
            Some(image) => images.push(image),
            None => warn!(index, "Dropping upstream image without url or b64_json"),
        }
    }

    let reported = parsed
        .usage
        .filter(|value| !value.is_null())
        .and_then(|value| match ReportedUsage::parse(&value) {
            Ok(reported) => Some(reported),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed usage record");
                None
            }
        });
    let usage = resolve_usage(reported, images.len());

    Ok(UpstreamReply {
        result: GenerationResult { images, usage },
        raw,
    })
}

/// Event-stream body. Malformed or unknown blocks are logged and skipped so that
/// partial results still reach the caller.
pub fn normalize_event_stream(body: &str) -> UpstreamReply {
    let mut images = Vec::new();
    let mut usage = None;
    let mut accepted = Vec::new();

    for (block, event) in sse::parse_events(body).into_iter().enumerate() {
        if event.is_done() {
            continue;
        }

        let data: Value = match serde_json::from_str(&event.data) {
            Ok(data) => data,
            Err(e) => {
                warn!(block, error = %e, "Skipping event with malformed JSON data");
                continue;
            }
        };

        let event_type = event_type(&event, &data);
        match event_type.as_deref() {
            Some(EVENT_PARTIAL_SUCCEEDED) => match partial_image(&data) {
                Some(image) => images.push(image),
                None => warn!(block, "Skipping partial event without image and size"),
            },
            Some(EVENT_COMPLETED) => {
                if let Some(reported) = data.get("usage").filter(|value| !value.is_null()) {
                    match ReportedUsage::parse(reported) {
                        Ok(reported) => usage = Some(reported),
                        Err(e) => warn!(block, error = %e, "Ignoring malformed usage record"),
                    }
                }
            }
            Some(EVENT_PARTIAL_FAILED) => {
                warn!(block, error = ?data.get("error"), "Upstream failed to generate one image");
            }
            other => {
                debug!(block, event = ?other, "Ignoring unrecognized event");
            }
        }

        accepted.push(data);
    }

    let usage = resolve_usage(usage, images.len());

    UpstreamReply {
        result: GenerationResult { images, usage },
        raw: Value::Array(accepted),
    }
}

/// `event:` line first, then the payload's own `type` field
fn event_type(event: &SseEvent, data: &Value) -> Option<String> {
    event.event.clone().or_else(|| {
        data.get("type")
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}

fn partial_image(data: &Value) -> Option<CanonicalImage> {
    let size = data.get("size").and_then(Value::as_str)?.to_string();

    if let Some(url) = data.get("url").and_then(Value::as_str) {
        return Some(CanonicalImage::from_url(url, Some(size)));
    }

    data.get("b64_json")
        .and_then(Value::as_str)
        .map(|encoded| CanonicalImage::from_base64(encoded, Some(size)))
}
