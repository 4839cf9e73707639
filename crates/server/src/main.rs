//! newsdesk REST API server
//!
//! Bias judging, article generation with optional deep research, and the
//! saved-article store over HTTP.

mod error;
mod routes;
mod state;

use anyhow::{Context, Result};
use llm_bridge::Providers;
use news_core::config::Settings;
use state::AppState;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env()?;
    let providers = Providers::from_settings(&settings)?;
    let state = Arc::new(AppState::build(&settings, providers).await?);

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;
    tracing::info!("Server listening on {}", settings.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
