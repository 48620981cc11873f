//! Character image: edit an input image, or generate one from text

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::UpstreamConfig;
use crate::error::{AppError, Result};
use crate::generation::{ReferenceImages, ResponseFormat, UpstreamPayload};
use crate::upstream::ImageUpstream;
use crate::workflows::style_plan::EditPlan;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterRequest {
    pub final_prompt: String,
    #[serde(default)]
    pub strength: f32,
    #[serde(default)]
    pub seededit_payload: EditPlan,
    #[serde(default)]
    pub input_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterResponse {
    pub output_image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seedream_response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seededit_response: Option<Value>,
}

impl CharacterRequest {
    fn input_image(&self) -> Option<&str> {
        self.input_image
            .as_deref()
            .filter(|image| !image.trim().is_empty())
    }

    /// Prompt text carrying the plan's identity constraints and strength
    pub fn composed_prompt(&self) -> String {
        format!(
            "{}\nConstraints: [{}]\nStrength: {}",
            self.final_prompt.trim(),
            self.seededit_payload.preserve_identity.join(", "),
            self.strength
        )
    }
}

pub fn edit_payload(model: &str, prompt: String, input_image: &str) -> UpstreamPayload {
    let mut payload = UpstreamPayload::new(model, prompt);
    payload.image = Some(ReferenceImages::Single(input_image.to_string()));
    payload.response_format = Some(ResponseFormat::Url);
    payload.size = Some("adaptive".to_string());
    payload.guidance_scale = Some(1.1);
    payload.watermark = Some(false);
    payload
}

pub fn generate_payload(model: &str, prompt: String) -> UpstreamPayload {
    let mut payload = UpstreamPayload::new(model, prompt);
    payload.response_format = Some(ResponseFormat::Url);
    payload.size = Some("1024x1024".to_string());
    payload.guidance_scale = Some(6.0);
    payload.seed = Some(42);
    payload.watermark = Some(false);
    payload
}

pub async fn run(
    upstream: &dyn ImageUpstream,
    config: &UpstreamConfig,
    request: &CharacterRequest,
) -> Result<CharacterResponse> {
    if request.final_prompt.trim().is_empty() {
        return Err(AppError::BadRequest("final_prompt must not be empty".to_string()));
    }

    let prompt = request.composed_prompt();
    let editing = request.input_image();

    let payload = match editing {
        Some(image) => edit_payload(&config.edit_model, prompt, image),
        None => generate_payload(&config.generate_model, prompt),
    };

    let reply = upstream.generate(&payload, config.single_timeout()).await?;
    let output_image_url = reply
        .result
        .first_url()
        .map(str::to_string)
        .ok_or_else(|| AppError::EmptyResult("character request returned no image URL".to_string()))?;

    info!(edited = editing.is_some(), "Character image ready");

    Ok(match editing {
        Some(_) => CharacterResponse {
            output_image_url,
            seedream_response: None,
            seededit_response: Some(reply.raw),
        },
        None => CharacterResponse {
            output_image_url,
            seedream_response: Some(reply.raw),
            seededit_response: None,
        },
    })
}
