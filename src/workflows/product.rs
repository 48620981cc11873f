//! Two-stage product photo pipeline: generate, then refine with the edit model

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::config::UpstreamConfig;
use crate::error::{AppError, Result};
use crate::generation::{ReferenceImages, ResponseFormat, UpstreamPayload};
use crate::upstream::ImageUpstream;

pub const REFINE_PROMPT: &str =
    "Enhance the quality of the image by improving accuracy of packaging or lighting.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRequest {
    #[serde(default)]
    pub prompts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductResponse {
    pub images_url: Vec<String>,
}

/// First stage: a product photo from the text prompt
pub fn primary_payload(model: &str, prompt: &str) -> UpstreamPayload {
    let mut payload = UpstreamPayload::new(
        model,
        format!("Generate a high-quality, production-grade product photo of {}", prompt),
    );
    payload.response_format = Some(ResponseFormat::Url);
    payload.size = Some("1024x1024".to_string());
    payload.guidance_scale = Some(5.5);
    payload.seed = Some(42);
    payload.watermark = Some(false);
    payload
}

/// Second stage: the edit model touches up the first stage's output
pub fn refine_payload(model: &str, image_url: &str) -> UpstreamPayload {
    let mut payload = UpstreamPayload::new(model, REFINE_PROMPT);
    payload.image = Some(ReferenceImages::Single(image_url.to_string()));
    payload.response_format = Some(ResponseFormat::Url);
    payload.size = Some("adaptive".to_string());
    payload.guidance_scale = Some(1.1);
    payload.watermark = Some(false);
    payload
}

async fn first_url(
    upstream: &dyn ImageUpstream,
    payload: &UpstreamPayload,
    timeout: Duration,
    stage: &str,
) -> Result<String> {
    let reply = upstream.generate(payload, timeout).await?;
    reply
        .result
        .first_url()
        .map(str::to_string)
        .ok_or_else(|| AppError::EmptyResult(format!("{} stage returned no image URL", stage)))
}

/// Run both stages for every prompt, one prompt at a time
pub async fn run(
    upstream: &dyn ImageUpstream,
    config: &UpstreamConfig,
    request: &ProductRequest,
) -> Result<ProductResponse> {
    if request.prompts.is_empty() {
        return Err(AppError::BadRequest("At least one prompt is required.".to_string()));
    }
    if request.prompts.iter().any(|prompt| prompt.trim().is_empty()) {
        return Err(AppError::BadRequest("Prompts must not be empty.".to_string()));
    }

    let timeout = config.single_timeout();
    let mut images_url = Vec::with_capacity(request.prompts.len());

    for (index, prompt) in request.prompts.iter().enumerate() {
        let generated = first_url(
            upstream,
            &primary_payload(&config.generate_model, prompt),
            timeout,
            "generation",
        )
        .await?;

        let refined = first_url(
            upstream,
            &refine_payload(&config.edit_model, &generated),
            timeout,
            "refinement",
        )
        .await?;

        info!(index, "Product image generated and refined");
        images_url.push(refined);
    }

    Ok(ProductResponse { images_url })
}
