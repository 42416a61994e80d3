// Main entry point for the chat front-end server

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use extract::{ApiKey, FirecrawlExtractor};
use server_core::{
    server::app::build_app,
    sessions::SessionRegistry,
    Config,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long a session may sit untouched before the sweeper drops it.
const SESSION_IDLE_TTL: Duration = Duration::from_secs(60 * 60);
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,extract=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting website-to-structured-data chat server");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    if config.firecrawl_api_key.is_none() {
        tracing::warn!(
            "FIRECRAWL_API_KEY is not set; extraction requests will fail until it is"
        );
    }

    // Build the extraction client
    let mut extractor =
        FirecrawlExtractor::new(config.firecrawl_api_key.clone().map(ApiKey::new))
            .context("Failed to create extraction client")?;
    if let Some(api_url) = &config.firecrawl_api_url {
        extractor = extractor.with_api_url(api_url);
    }

    // Build application
    let registry = Arc::new(SessionRegistry::new(Arc::new(extractor)));

    // Sweep sessions the UI never got to delete (crashed tabs, lost clients).
    let sweeper = registry.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweeper.remove_expired(SESSION_IDLE_TTL).await;
        }
    });

    let app = build_app(registry);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Chat UI: http://localhost:{}/", config.port);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
