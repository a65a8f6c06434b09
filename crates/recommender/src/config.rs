use anyhow::Context;
use pipeline::WatchedPolicy;
use providers::anilist::ANILIST_ENDPOINT;
use providers::mal::MAL_API_URL;
use serde::Deserialize;
use std::time::Duration;

/// Prefix shared by every configuration variable
pub const ENV_PREFIX: &str = "ANIME_SWIPE_";

/// Pipeline tuning loaded from `ANIME_SWIPE_*` environment variables
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Seeds drawn per ordering (recent, top rated)
    #[serde(default = "default_seed_limit")]
    pub seed_limit: usize,

    /// Seeds per upstream recommendations page
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Recommended titles requested per seed
    #[serde(default = "default_recommendations_per_seed")]
    pub recommendations_per_seed: usize,

    /// Titles requested from a suggestion feed
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,

    /// Minimum gap between upstream calls per provider; 0 disables pacing
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_anilist_url")]
    pub anilist_url: String,

    #[serde(default = "default_mal_url")]
    pub mal_url: String,

    /// Behaviour when the user's list cannot be fetched
    #[serde(default)]
    pub watched_policy: WatchedPolicy,
}

fn default_seed_limit() -> usize {
    5
}

fn default_batch_size() -> usize {
    50
}

fn default_recommendations_per_seed() -> usize {
    10
}

fn default_suggestion_limit() -> usize {
    100
}

fn default_pacing_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_anilist_url() -> String {
    ANILIST_ENDPOINT.to_string()
}

fn default_mal_url() -> String {
    MAL_API_URL.to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed_limit: default_seed_limit(),
            batch_size: default_batch_size(),
            recommendations_per_seed: default_recommendations_per_seed(),
            suggestion_limit: default_suggestion_limit(),
            pacing_ms: default_pacing_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            anilist_url: default_anilist_url(),
            mal_url: default_mal_url(),
            watched_policy: WatchedPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from the process environment, reading `.env` first if present
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load from an explicit set of variables
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: PipelineConfig = envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .context("Failed to load pipeline config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.request_timeout_secs == 0 {
            anyhow::bail!("{ENV_PREFIX}REQUEST_TIMEOUT_SECS must be at least 1");
        }
        if self.batch_size == 0 {
            anyhow::bail!("{ENV_PREFIX}BATCH_SIZE must be at least 1");
        }
        Ok(())
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
