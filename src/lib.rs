//! BytePlus Image Gateway
//!
//! A thin, stateless HTTP service that validates image generation requests,
//! forwards them to the BytePlus generation API and normalizes the JSON or
//! event-stream answer into one canonical image list.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod generation;
pub mod middleware;
pub mod response;
pub mod upstream;
pub mod workflows;

pub use error::{AppError, Result};

use std::sync::Arc;

use upstream::ImageUpstream;

/// Application state shared across all handlers. Read-only after startup.
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub upstream: Arc<dyn ImageUpstream>,
}

impl AppState {
    pub fn new(settings: config::Settings, upstream: Arc<dyn ImageUpstream>) -> Self {
        Self {
            settings: Arc::new(settings),
            upstream,
        }
    }
}
