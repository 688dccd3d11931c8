use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Process-wide configuration loaded once from the environment at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_min_connections: u32,

    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_redirect_uri: String,

    pub lastfm_key: String,
    pub lastfm_secret: String,
    pub lastfm_username: Option<String>,
    pub lastfm_password: Option<String>,

    pub api_rate_limit: u32,
    pub batch_size: usize,
    pub concurrency_limit: usize,
    pub retry_count: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub request_delay_ms: u64,

    pub workflows_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: parse_env_or("DATABASE_POOL_MAX_SIZE", 10)?,
            database_min_connections: parse_env_or("DATABASE_POOL_MIN_SIZE", 1)?,

            spotify_client_id: env::var("SPOTIFY_CLIENT_ID")
                .context("SPOTIFY_CLIENT_ID must be set")?,
            spotify_client_secret: env::var("SPOTIFY_CLIENT_SECRET")
                .context("SPOTIFY_CLIENT_SECRET must be set")?,
            spotify_redirect_uri: env::var("SPOTIFY_REDIRECT_URI")
                .context("SPOTIFY_REDIRECT_URI must be set")?,

            lastfm_key: env::var("LASTFM_KEY").context("LASTFM_KEY must be set")?,
            lastfm_secret: env::var("LASTFM_SECRET").context("LASTFM_SECRET must be set")?,
            lastfm_username: env::var("LASTFM_USERNAME").ok(),
            lastfm_password: env::var("LASTFM_PASSWORD").ok(),

            api_rate_limit: parse_env_or("LASTFM_API_RATE_LIMIT", 5)?,
            batch_size: parse_env_or("LASTFM_BATCH_SIZE", 50)?,
            concurrency_limit: parse_env_or("LASTFM_CONCURRENCY", 5)?,
            retry_count: parse_env_or("LASTFM_RETRY_COUNT", 3)?,
            retry_base_delay_ms: parse_env_or("LASTFM_RETRY_BASE_DELAY", 500)?,
            retry_max_delay_ms: parse_env_or("LASTFM_RETRY_MAX_DELAY", 30_000)?,
            request_delay_ms: parse_env_or("LASTFM_REQUEST_DELAY", 200)?,

            workflows_dir: env::var("WORKFLOWS_DIR").unwrap_or_else(|_| "workflows".to_string()),
        })
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} must be a valid value: {e}")),
        Err(_) => Ok(default),
    }
}
