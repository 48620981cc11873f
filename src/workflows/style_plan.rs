//! Merges a style prompt and identity constraints into an edit payload

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylePlanRequest {
    pub final_prompt: String,
    pub strength: f32,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Edit instructions handed to the character endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_image: Option<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub strength: f32,
    #[serde(default)]
    pub preserve_identity: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylePlanOutput {
    pub prompt: String,
    pub strength: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Text-to-image plan, used when no input image was given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seedream_payload: Option<EditPlan>,
    /// Image edit plan, used when an input image was given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seededit_payload: Option<EditPlan>,
}

pub fn create_plan(request: &StylePlanRequest) -> Result<StylePlanOutput> {
    if request.final_prompt.trim().is_empty() {
        return Err(AppError::BadRequest("final_prompt must not be empty".to_string()));
    }

    let image_url = request
        .image_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .map(str::to_string);

    let plan = EditPlan {
        input_image: image_url.clone(),
        prompt: request.final_prompt.clone(),
        strength: request.strength,
        preserve_identity: request.constraints.clone(),
    };

    let (seedream_payload, seededit_payload) = match image_url {
        Some(_) => (None, Some(plan)),
        None => (Some(plan), None),
    };

    Ok(StylePlanOutput {
        prompt: request.final_prompt.clone(),
        strength: request.strength,
        image_url,
        seedream_payload,
        seededit_payload,
    })
}
