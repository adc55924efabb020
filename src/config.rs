use crate::llm::gemini::DEFAULT_MODEL;
use crate::providers::census::DEFAULT_CENSUS_URL;
use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Without a key the planner falls back and summaries are unavailable
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: Option<String>,
    /// Bound on each outbound provider request
    pub provider_timeout: Duration,
    pub census_api_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let provider_timeout_secs: u64 = env::var("PROVIDER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "8".to_string())
            .parse()
            .context("PROVIDER_TIMEOUT_SECS must be a whole number of seconds")?;

        Ok(Self {
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            gemini_model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            gemini_base_url: env::var("GEMINI_BASE_URL").ok(),
            provider_timeout: Duration::from_secs(provider_timeout_secs.max(1)),
            census_api_url: env::var("CENSUS_API_URL")
                .unwrap_or_else(|_| DEFAULT_CENSUS_URL.to_string()),
        })
    }

    /// Guard applied around a whole provider call, above the request timeout
    pub fn provider_guard_timeout(&self) -> Duration {
        self.provider_timeout * 2
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_base_url: None,
            provider_timeout: Duration::from_secs(8),
            census_api_url: DEFAULT_CENSUS_URL.to_string(),
        }
    }
}
