mod config;
mod errors;
mod ingest;
mod llm_client;
mod protocol;
mod record;
mod routes;
mod session;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::ingest::profile::ProfileFetcher;
use crate::llm_client::OpenAiCompletionClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting EB1-A intake API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize completion client
    let completion = OpenAiCompletionClient::new(
        config.completion_api_url.clone(),
        config.openai_api_key.clone(),
        config.completion_model.clone(),
    )?;
    info!("Completion client initialized (model: {})", completion.model());

    let profiles = ProfileFetcher::new(config.profile_fetch_enabled, config.max_document_chars)?;
    info!(
        "Profile fetching {}",
        if config.profile_fetch_enabled { "enabled" } else { "disabled" }
    );

    let state = AppState::new(&config, Arc::new(completion), profiles);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
