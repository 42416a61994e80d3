use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Absence is not a startup failure; it surfaces as an extraction-time
    /// error on the first chat attempt.
    pub firecrawl_api_key: Option<String>,
    /// Override for self-hosted Firecrawl or tests.
    pub firecrawl_api_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            firecrawl_api_key: env::var("FIRECRAWL_API_KEY").ok(),
            firecrawl_api_url: env::var("FIRECRAWL_API_URL").ok(),
        })
    }
}
