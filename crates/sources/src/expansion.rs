//! Batch Recommendation Fetcher - expand seeds through the provider's
//! "similar titles" graph
//!
//! ## Algorithm
//! 1. Split the seeds into batches no larger than the provider's page cap
//! 2. Ask the graph for up to `per_seed` recommendations per seed
//! 3. Flatten each seed's titles in upstream order, tagging the seed
//! 4. A failed batch contributes nothing; later batches still run

use crate::types::{Candidate, CandidateSource};
use catalog::{Credentials, SeedId};
use providers::RecommendationGraph;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Default upstream page size for a seed batch
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default number of recommended titles requested per seed
pub const DEFAULT_PER_SEED: usize = 10;

/// Expands seed ids into tagged candidates
pub struct BatchRecommendationFetcher<G: ?Sized> {
    graph: Arc<G>,
    batch_size: usize,
    per_seed: usize,
}

// Manual impl: `G` itself need not be `Clone` behind the `Arc`
impl<G: ?Sized> Clone for BatchRecommendationFetcher<G> {
    fn clone(&self) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            batch_size: self.batch_size,
            per_seed: self.per_seed,
        }
    }
}

impl<G: RecommendationGraph + ?Sized> BatchRecommendationFetcher<G> {
    pub fn new(graph: Arc<G>) -> Self {
        let batch_size = DEFAULT_BATCH_SIZE.min(graph.max_batch_size()).max(1);
        Self {
            graph,
            batch_size,
            per_seed: DEFAULT_PER_SEED,
        }
    }

    /// Configure seeds per upstream page, clamped to the provider's cap
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.min(self.graph.max_batch_size()).max(1);
        self
    }

    /// Configure recommendations requested per seed (default: 10)
    pub fn with_per_seed(mut self, per_seed: usize) -> Self {
        self.per_seed = per_seed;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Recommendations for every seed, flattened in seed then upstream order
    ///
    /// # Arguments
    /// * `credentials` - Bearer credentials for the graph
    /// * `seeds` - Seed ids in priority order
    /// * `source` - Tag stamped on every produced candidate
    #[instrument(skip(self, credentials, seeds), fields(seeds = seeds.len()))]
    pub async fn fetch_recommendations_for_seeds(
        &self,
        credentials: &Credentials,
        seeds: &[SeedId],
        source: CandidateSource,
    ) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        if self.per_seed == 0 {
            return candidates;
        }

        for (index, batch) in seeds.chunks(self.batch_size).enumerate() {
            match self.graph.related_titles(credentials, batch, self.per_seed).await {
                Ok(grouped) => {
                    for group in grouped {
                        candidates.extend(
                            group
                                .titles
                                .into_iter()
                                .take(self.per_seed)
                                .map(|anime| Candidate::from_seed(anime, source, group.seed)),
                        );
                    }
                }
                Err(e) => {
                    warn!(batch = index, size = batch.len(), error = %e, "Recommendation batch failed, skipping");
                }
            }
        }

        debug!(%source, count = candidates.len(), "Expanded seeds into candidates");
        candidates
    }
}
