//! Caller-facing generation request and the builder that turns it into an upstream payload

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::generation::payload::{
    ReferenceImages, ResponseFormat, SequentialMode, SequentialOptions, UpstreamPayload,
};

/// Words that already tell the model to produce more than one image
pub const SERIES_KEYWORDS: [&str; 5] = ["series", "illustrations", "images", "variations", "different"];

/// Output resolution tiers accepted by the generation API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "1K")]
    OneK,
    #[default]
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::OneK => "1K",
            ImageSize::TwoK => "2K",
            ImageSize::FourK => "4K",
        }
    }
}

/// Body of `POST /byteplus-generate` and `POST /byteplus-generate-image`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model or endpoint id; the configured generation model when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub prompt: String,

    /// Reference image(s). Present means image-to-image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ReferenceImages>,

    #[serde(default)]
    pub sequential_image_generation: SequentialMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequential_image_generation_options: Option<SequentialOptions>,

    #[serde(default)]
    pub response_format: ResponseFormat,

    #[serde(default)]
    pub size: ImageSize,

    #[serde(default)]
    pub stream: bool,

    #[serde(default = "default_watermark")]
    pub watermark: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance_scale: Option<f32>,
}

fn default_watermark() -> bool {
    true
}

impl GenerationRequest {
    /// Text-to-image request with default settings
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            prompt: prompt.into(),
            image: None,
            sequential_image_generation: SequentialMode::Disabled,
            sequential_image_generation_options: None,
            response_format: ResponseFormat::Url,
            size: ImageSize::default(),
            stream: false,
            watermark: default_watermark(),
            seed: None,
            guidance_scale: None,
        }
    }

    pub fn max_images(&self) -> Option<u32> {
        self.sequential_image_generation_options
            .and_then(|options| options.max_images)
    }

    pub fn is_image_to_image(&self) -> bool {
        self.image.is_some()
    }

    /// Sequential requests take far longer upstream and get the long timeout
    pub fn is_sequential(&self) -> bool {
        self.sequential_image_generation == SequentialMode::Auto || self.max_images().is_some()
    }

    /// Reject input that can never produce a valid upstream call
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(AppError::BadRequest("prompt must not be empty".to_string()));
        }

        if self.max_images() == Some(0) {
            return Err(AppError::BadRequest(
                "sequential_image_generation_options.max_images must be at least 1".to_string(),
            ));
        }

        if let Some(images) = &self.image {
            if images.is_empty() {
                return Err(AppError::BadRequest(
                    "image list must contain at least one reference image".to_string(),
                ));
            }
            if images.iter().any(|image| image.trim().is_empty()) {
                return Err(AppError::BadRequest(
                    "reference images must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Prompt as it will be sent upstream
    pub fn effective_prompt(&self) -> String {
        match (self.sequential_image_generation, self.max_images()) {
            (SequentialMode::Auto, Some(max_images)) if max_images > 1 => {
                rewrite_prompt_for_series(&self.prompt, max_images)
            }
            _ => self.prompt.clone(),
        }
    }

    /// Assemble the upstream payload. Pure; no validation is repeated here.
    pub fn build_payload(&self, default_model: &str) -> UpstreamPayload {
        let model = self
            .model
            .as_deref()
            .filter(|model| !model.trim().is_empty())
            .unwrap_or(default_model);

        let mut payload = UpstreamPayload::new(model, self.effective_prompt());
        payload.image = self.image.clone();
        payload.sequential_image_generation = Some(self.sequential_image_generation);
        payload.sequential_image_generation_options = self
            .max_images()
            .map(|max_images| SequentialOptions { max_images: Some(max_images) });
        payload.response_format = Some(self.response_format);
        payload.size = Some(self.size.as_str().to_string());
        payload.stream = Some(self.stream);
        payload.watermark = Some(self.watermark);
        payload.seed = self.seed;
        payload.guidance_scale = self.guidance_scale;
        payload
    }
}

/// True when the prompt already asks for several images in plain words
pub fn mentions_series(prompt: &str) -> bool {
    let lowered = prompt.to_lowercase();
    SERIES_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

/// The upstream model only returns several images when the prompt says so explicitly.
/// This is a keyword heuristic, not a documented contract of the API.
pub fn rewrite_prompt_for_series(prompt: &str, max_images: u32) -> String {
    if mentions_series(prompt) {
        return prompt.to_string();
    }

    format!(
        "Generate a series of {} coherent illustrations of {}, each showing different perspectives or variations, presented in a unified style.",
        max_images, prompt
    )
}
