//! In-memory tracker for exercising pipeline stages without a network.
//!
//! Enabled for this crate's own tests and, through the `fake` feature, for
//! downstream dev-dependencies.

use crate::error::{ProviderError, ProviderResult};
use crate::{AnimeTracker, RecommendationGraph, SeedOrder, SeedRecommendations, SuggestionFeed};
use async_trait::async_trait;
use catalog::{Anime, AnimeId, Credentials, Provider, SeedId, Viewer};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// How a faked call should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeFailure {
    /// Upstream rejected the token
    Unauthorized,
    /// Upstream answered 503
    Unavailable,
}

impl FakeFailure {
    fn into_error(self, provider: Provider) -> ProviderError {
        match self {
            FakeFailure::Unauthorized => ProviderError::Unauthorized { provider },
            FakeFailure::Unavailable => ProviderError::Status {
                provider,
                status: 503,
                body: "service unavailable".to_string(),
            },
        }
    }
}

type Outcome<T> = Result<T, FakeFailure>;

#[derive(Debug, Default)]
struct CallLog {
    batches: Vec<Vec<SeedId>>,
    planned: Vec<AnimeId>,
    listed_fetches: usize,
}

/// Configurable fake implementing every provider trait
#[derive(Debug, Clone)]
pub struct FakeTracker {
    provider: Provider,
    viewer: Outcome<Viewer>,
    recent: Outcome<Vec<SeedId>>,
    top_rated: Outcome<Vec<SeedId>>,
    related: HashMap<SeedId, Vec<Anime>>,
    failing_seeds: HashSet<SeedId>,
    listed: Outcome<HashSet<AnimeId>>,
    suggestions: Outcome<Vec<Anime>>,
    max_batch_size: usize,
    log: Arc<Mutex<CallLog>>,
}

impl FakeTracker {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            viewer: Ok(Viewer {
                id: 1,
                name: "tester".to_string(),
                avatar: None,
                statistics: None,
            }),
            recent: Ok(Vec::new()),
            top_rated: Ok(Vec::new()),
            related: HashMap::new(),
            failing_seeds: HashSet::new(),
            listed: Ok(HashSet::new()),
            suggestions: Ok(Vec::new()),
            max_batch_size: 50,
            log: Arc::new(Mutex::new(CallLog::default())),
        }
    }

    pub fn with_viewer(mut self, viewer: Viewer) -> Self {
        self.viewer = Ok(viewer);
        self
    }

    pub fn failing_viewer(mut self, failure: FakeFailure) -> Self {
        self.viewer = Err(failure);
        self
    }

    pub fn with_seeds(mut self, order: SeedOrder, seeds: Vec<SeedId>) -> Self {
        *self.seeds_mut(order) = Ok(seeds);
        self
    }

    pub fn failing_seeds(mut self, order: SeedOrder, failure: FakeFailure) -> Self {
        *self.seeds_mut(order) = Err(failure);
        self
    }

    /// Titles returned for `seed`, in the given order
    pub fn with_related(mut self, seed: SeedId, titles: Vec<Anime>) -> Self {
        self.related.insert(seed, titles);
        self
    }

    /// Any batch that contains `seed` fails
    pub fn failing_batch_with(mut self, seed: SeedId) -> Self {
        self.failing_seeds.insert(seed);
        self
    }

    pub fn with_listed(mut self, ids: impl IntoIterator<Item = AnimeId>) -> Self {
        self.listed = Ok(ids.into_iter().collect());
        self
    }

    pub fn failing_listed(mut self, failure: FakeFailure) -> Self {
        self.listed = Err(failure);
        self
    }

    pub fn with_suggestions(mut self, titles: Vec<Anime>) -> Self {
        self.suggestions = Ok(titles);
        self
    }

    pub fn failing_suggestions(mut self, failure: FakeFailure) -> Self {
        self.suggestions = Err(failure);
        self
    }

    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Seed batches passed to `related_titles`, in call order
    pub fn batches(&self) -> Vec<Vec<SeedId>> {
        self.lock().batches.clone()
    }

    /// Ids passed to `mark_planned`, in call order
    pub fn planned(&self) -> Vec<AnimeId> {
        self.lock().planned.clone()
    }

    pub fn listed_fetches(&self) -> usize {
        self.lock().listed_fetches
    }

    fn seeds_mut(&mut self, order: SeedOrder) -> &mut Outcome<Vec<SeedId>> {
        match order {
            SeedOrder::Recency => &mut self.recent,
            SeedOrder::Score => &mut self.top_rated,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CallLog> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check<T: Clone>(&self, outcome: &Outcome<T>) -> ProviderResult<T> {
        outcome.clone().map_err(|failure| failure.into_error(self.provider))
    }
}

#[async_trait]
impl AnimeTracker for FakeTracker {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn viewer(&self, _credentials: &Credentials) -> ProviderResult<Viewer> {
        self.check(&self.viewer)
    }

    async fn completed_seeds(
        &self,
        _credentials: &Credentials,
        _viewer: &Viewer,
        order: SeedOrder,
        limit: usize,
    ) -> ProviderResult<Vec<SeedId>> {
        let outcome = match order {
            SeedOrder::Recency => &self.recent,
            SeedOrder::Score => &self.top_rated,
        };
        let mut seeds = self.check(outcome)?;
        seeds.truncate(limit);
        Ok(seeds)
    }

    async fn listed_ids(
        &self,
        _credentials: &Credentials,
        _viewer: &Viewer,
    ) -> ProviderResult<HashSet<AnimeId>> {
        self.lock().listed_fetches += 1;
        self.check(&self.listed)
    }

    async fn mark_planned(&self, _credentials: &Credentials, anime_id: AnimeId) -> ProviderResult<()> {
        self.check(&self.viewer)?;
        self.lock().planned.push(anime_id);
        Ok(())
    }
}

#[async_trait]
impl RecommendationGraph for FakeTracker {
    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    async fn related_titles(
        &self,
        _credentials: &Credentials,
        seeds: &[SeedId],
        per_seed: usize,
    ) -> ProviderResult<Vec<SeedRecommendations>> {
        self.lock().batches.push(seeds.to_vec());
        if seeds.iter().any(|seed| self.failing_seeds.contains(seed)) {
            return Err(FakeFailure::Unavailable.into_error(self.provider));
        }
        Ok(seeds
            .iter()
            .filter_map(|seed| {
                self.related.get(seed).map(|titles| SeedRecommendations {
                    seed: *seed,
                    titles: titles.iter().take(per_seed).cloned().collect(),
                })
            })
            .collect())
    }
}

#[async_trait]
impl SuggestionFeed for FakeTracker {
    async fn suggestions(&self, _credentials: &Credentials, limit: usize) -> ProviderResult<Vec<Anime>> {
        let mut titles = self.check(&self.suggestions)?;
        titles.truncate(limit);
        Ok(titles)
    }
}
