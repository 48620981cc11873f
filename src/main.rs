//! Main entry point for the BytePlus image gateway

use byteplus_image_gateway::{
    api,
    config::{LoggingConfig, Settings},
    upstream::HttpUpstream,
    AppState,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "pretty" {
        registry.with(fmt::layer().pretty()).init();
    } else {
        registry.with(fmt::layer().json()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::load()?;
    settings.validate()?;

    init_tracing(&settings.logging);

    info!("Starting BytePlus image gateway");
    info!(
        "Loaded configuration: server={}:{} upstream={}",
        settings.server.host, settings.server.port, settings.upstream.base_url
    );
    if settings.upstream.api_key.is_empty() {
        warn!("No upstream API key configured; generation calls will be rejected upstream");
    }

    let upstream = Arc::new(HttpUpstream::new(&settings)?);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let app_state = Arc::new(AppState::new(settings, upstream));

    // Build the router
    let app = api::routes::create_router(app_state);

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
