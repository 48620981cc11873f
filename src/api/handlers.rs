//! Endpoint handlers. Each request runs received -> validated -> dispatched ->
//! normalizing -> responding and keeps no state afterwards.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::generation::GenerationRequest;
use crate::response::{direct, DirectImage, GenerationResult};
use crate::workflows::{
    character::{self, CharacterRequest, CharacterResponse},
    product::{self, ProductRequest, ProductResponse},
    style_plan::{self, StylePlanOutput, StylePlanRequest},
};
use crate::AppState;

/// Lifecycle of one facade request, used as a log field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    Dispatched,
    Normalizing,
    Responding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::Dispatched => "dispatched",
            Stage::Normalizing => "normalizing",
            Stage::Responding => "responding",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    #[serde(default)]
    pub image_index: i64,
}

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Validate, call upstream once and hand back the canonical result
async fn generate_canonical(state: &AppState, request: GenerationRequest) -> Result<GenerationResult> {
    let started = Instant::now();
    debug!(stage = %Stage::Received, image_to_image = request.is_image_to_image(), "Generation request");

    request.validate()?;
    let payload = request.build_payload(&state.settings.upstream.generate_model);
    let timeout = state.settings.upstream.timeout_for(request.is_sequential());
    debug!(stage = %Stage::Validated, prompt_rewritten = payload.prompt != request.prompt, "Payload built");

    debug!(stage = %Stage::Dispatched, timeout_secs = timeout.as_secs(), "Calling upstream");
    let reply = state.upstream.generate(&payload, timeout).await.map_err(|e| {
        warn!(error_kind = e.kind(), error = %e, "Upstream call failed");
        e
    })?;

    debug!(stage = %Stage::Normalizing, images = reply.result.len(), "Upstream replied");
    if reply.result.is_empty() {
        warn!("Upstream returned no images");
    }

    info!(
        images = reply.result.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Generation finished"
    );
    Ok(reply.result)
}

/// POST /byteplus-generate
pub async fn byteplus_generate(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerationResult>> {
    let span = info_span!("byteplus_generate", request_id = %Uuid::new_v4());

    async move {
        let request = json_body(payload)?;
        let result = generate_canonical(&state, request).await?;
        debug!(stage = %Stage::Responding, "Returning JSON result");
        Ok(Json(result))
    }
    .instrument(span)
    .await
}

/// POST /byteplus-generate-image?image_index=N
pub async fn byteplus_generate_image(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<ImageQuery>, QueryRejection>,
    payload: std::result::Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<DirectImage> {
    let span = info_span!("byteplus_generate_image", request_id = %Uuid::new_v4());

    async move {
        let Query(query) = query.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        let index = usize::try_from(query.image_index).map_err(|_| {
            AppError::BadRequest(format!(
                "image_index must be non-negative, got {}",
                query.image_index
            ))
        })?;
        let request = json_body(payload)?;

        let result = generate_canonical(&state, request).await?;
        let image = direct::respond(&result, index, state.upstream.as_ref()).await?;
        debug!(stage = %Stage::Responding, index, total = image.total, "Returning image bytes");
        Ok(image)
    }
    .instrument(span)
    .await
}

/// POST /generate
pub async fn generate_products(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ProductRequest>, JsonRejection>,
) -> Result<Json<ProductResponse>> {
    let span = info_span!("generate", request_id = %Uuid::new_v4());

    async move {
        let request = json_body(payload)?;
        let response = product::run(state.upstream.as_ref(), &state.settings.upstream, &request).await?;
        Ok(Json(response))
    }
    .instrument(span)
    .await
}

/// POST /plan
pub async fn plan(
    payload: std::result::Result<Json<StylePlanRequest>, JsonRejection>,
) -> Result<Json<StylePlanOutput>> {
    let request = json_body(payload)?;
    Ok(Json(style_plan::create_plan(&request)?))
}

/// POST /generate-chara
pub async fn generate_character(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<CharacterRequest>, JsonRejection>,
) -> Result<Json<CharacterResponse>> {
    let span = info_span!("generate_chara", request_id = %Uuid::new_v4());

    async move {
        let request = json_body(payload)?;
        let response = character::run(state.upstream.as_ref(), &state.settings.upstream, &request).await?;
        Ok(Json(response))
    }
    .instrument(span)
    .await
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
