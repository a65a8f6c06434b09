//! Clients for the two upstream anime trackers.
//!
//! This crate owns everything that touches the network:
//! - `anilist`: GraphQL client for AniList (single POST endpoint)
//! - `mal`: REST client for the MyAnimeList v2 API
//! - `pacing`: token-bucket gate every upstream call waits on
//! - `fake`: in-memory tracker (tests and the `fake` feature only)
//!
//! Callers depend on the traits below rather than the concrete clients, so
//! the pipeline stages can be exercised against in-memory fakes.

use async_trait::async_trait;
use catalog::{Anime, AnimeId, Credentials, Provider, SeedId, Viewer};
use std::collections::HashSet;
use std::time::Duration;

pub mod anilist;
pub mod error;
pub mod mal;
pub mod pacing;

#[cfg(any(test, feature = "fake"))]
pub mod fake;

pub use anilist::AniListClient;
pub use error::{ProviderError, ProviderResult};
pub use mal::MalClient;
pub use pacing::Pacer;

/// Sort order for a seed list drawn from the user's completed titles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeedOrder {
    /// Most recently updated list entries first
    Recency,
    /// Highest user score first
    Score,
}

/// One seed with its recommended titles, in upstream order
#[derive(Debug, Clone, PartialEq)]
pub struct SeedRecommendations {
    pub seed: SeedId,
    pub titles: Vec<Anime>,
}

/// Connection settings shared by both clients
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    /// Whole-request timeout; expiry surfaces as `ProviderError::Http`
    pub timeout: Duration,
    pub pacer: Pacer,
}

impl ClientOptions {
    pub fn new(base_url: impl Into<String>, timeout: Duration, pacer: Pacer) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
            pacer,
        }
    }
}

/// Build the reqwest client both trackers use
pub(crate) fn build_http_client(timeout: Duration) -> ProviderResult<reqwest::Client> {
    let user_agent = format!("anime-swipe/{}", env!("CARGO_PKG_VERSION"));
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5).min(timeout))
        .timeout(timeout)
        .user_agent(user_agent)
        .build()?;
    Ok(client)
}

/// A user's list on one tracker
#[async_trait]
pub trait AnimeTracker: Send + Sync {
    fn provider(&self) -> Provider;

    /// The authenticated user behind the credentials
    async fn viewer(&self, credentials: &Credentials) -> ProviderResult<Viewer>;

    /// First `limit` completed titles, sorted upstream by `order`
    async fn completed_seeds(
        &self,
        credentials: &Credentials,
        viewer: &Viewer,
        order: SeedOrder,
        limit: usize,
    ) -> ProviderResult<Vec<SeedId>>;

    /// Every title on the user's list, any status
    async fn listed_ids(
        &self,
        credentials: &Credentials,
        viewer: &Viewer,
    ) -> ProviderResult<HashSet<AnimeId>>;

    /// Put a title on the user's plan-to-watch list
    async fn mark_planned(&self, credentials: &Credentials, anime_id: AnimeId) -> ProviderResult<()>;
}

/// A "similar titles" relation that can be queried for many seeds at once
#[async_trait]
pub trait RecommendationGraph: Send + Sync {
    /// Largest number of seeds one upstream page accepts
    fn max_batch_size(&self) -> usize;

    /// Recommended titles for each seed, seeds in the order given
    async fn related_titles(
        &self,
        credentials: &Credentials,
        seeds: &[SeedId],
        per_seed: usize,
    ) -> ProviderResult<Vec<SeedRecommendations>>;
}

/// An upstream endpoint that already returns one ranked suggestion list
#[async_trait]
pub trait SuggestionFeed: Send + Sync {
    async fn suggestions(&self, credentials: &Credentials, limit: usize) -> ProviderResult<Vec<Anime>>;
}

/// Tracker whose recommendations come from expanding seed titles
pub trait SeededProvider: AnimeTracker + RecommendationGraph {}
impl<T: AnimeTracker + RecommendationGraph + ?Sized> SeededProvider for T {}

/// Tracker whose recommendations come from its own suggestion feed
pub trait SuggestingProvider: AnimeTracker + SuggestionFeed {}
impl<T: AnimeTracker + SuggestionFeed + ?Sized> SuggestingProvider for T {}
