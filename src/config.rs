use std::time::Duration;

use serde::Deserialize;

use crate::{models::UnresolvedPolicy, services::retry::RetryPolicy};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the backend serving `/recommend/*` and `/api/mlb/video`
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Redis connection URL; highlight metadata is only cached when set
    #[serde(default)]
    pub redis_url: Option<String>,

    /// How long resolved highlight metadata stays cached, in seconds
    #[serde(default = "default_highlight_cache_ttl")]
    pub highlight_cache_ttl_secs: u64,

    /// Ratings table the model recommender reads from
    #[serde(default = "default_model_table")]
    pub model_table: String,

    /// Attempts per backend request, including the first one
    #[serde(default = "default_http_retries")]
    pub http_retries: u32,

    /// Base delay between backend request attempts, in milliseconds
    #[serde(default = "default_http_retry_delay_ms")]
    pub http_retry_delay_ms: u64,

    /// Per-request timeout, in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// What to do with a reel whose metadata could not be resolved
    #[serde(default)]
    pub unresolved_policy: UnresolvedPolicy,

    /// Feeds untouched for this long are closed and forgotten, in seconds
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// How often idle feeds are swept, in seconds
    #[serde(default = "default_session_sweep_interval")]
    pub session_sweep_interval_secs: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_backend_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_highlight_cache_ttl() -> u64 {
    86400 // 1 day
}

fn default_model_table() -> String {
    "user_ratings_db".to_string()
}

fn default_http_retries() -> u32 {
    3
}

fn default_http_retry_delay_ms() -> u64 {
    1000
}

fn default_http_timeout() -> u64 {
    10
}

fn default_session_ttl() -> u64 {
    1800 // 30 minutes
}

fn default_session_sweep_interval() -> u64 {
    60
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.http_retries,
            Duration::from_millis(self.http_retry_delay_ms),
        )
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Never zero, `tokio::time::interval` rejects that
    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs.max(1))
    }
}
