//! Suggestion Source - the provider's own ranked suggestion feed
//!
//! Used where the tracker already ranks titles for the user (MyAnimeList),
//! replacing seeding and expansion with one upstream call.

use crate::types::{Candidate, CandidateSource};
use catalog::Credentials;
use providers::{ProviderResult, SuggestionFeed};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Default number of suggestions requested
pub const DEFAULT_SUGGESTION_LIMIT: usize = 100;

pub struct SuggestionSource<F: ?Sized> {
    feed: Arc<F>,
    limit: usize,
}

impl<F: ?Sized> Clone for SuggestionSource<F> {
    fn clone(&self) -> Self {
        Self {
            feed: Arc::clone(&self.feed),
            limit: self.limit,
        }
    }
}

impl<F: SuggestionFeed + ?Sized> SuggestionSource<F> {
    pub fn new(feed: Arc<F>) -> Self {
        Self {
            feed,
            limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }

    /// Configure how many suggestions to request (default: 100)
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Suggested titles in upstream rank order
    #[instrument(skip_all, fields(limit = self.limit))]
    pub async fn get_candidates(&self, credentials: &Credentials) -> ProviderResult<Vec<Candidate>> {
        let titles = self.feed.suggestions(credentials, self.limit).await?;
        let candidates: Vec<Candidate> = titles
            .into_iter()
            .take(self.limit)
            .map(|anime| Candidate::new(anime, CandidateSource::Suggested))
            .collect();
        debug!(count = candidates.len(), "Fetched suggested candidates");
        Ok(candidates)
    }
}
