//! Router construction

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::api::handlers;
use crate::middleware::auth::AuthLayer;
use crate::AppState;

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let auth = AuthLayer::new(state.settings.auth.api_keys.clone());
    if auth.is_open() {
        warn!("No inbound API keys configured; the gateway accepts unauthenticated requests");
    }

    Router::new()
        .route("/byteplus-generate", post(handlers::byteplus_generate))
        .route("/byteplus-generate-image", post(handlers::byteplus_generate_image))
        .route("/generate", post(handlers::generate_products))
        .route("/plan", post(handlers::plan))
        .route("/generate-chara", post(handlers::generate_character))
        .route("/health", get(handlers::health))
        .layer(auth)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
