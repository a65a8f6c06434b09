//! # Sources Crate
//!
//! Candidate generation for anime recommendations. Every source talks to an
//! upstream tracker through the traits in `providers`, so the same code runs
//! against AniList, MyAnimeList, or an in-memory fake.
//!
//! ## Components
//!
//! ### History (seeding)
//! Draws two seed lists from the user's completed titles:
//! - Most recently updated (up to 5)
//! - Highest scored (up to 5)
//!
//! ### Batch Recommendation Fetcher (expansion)
//! "Viewers who liked this also liked..." lookups for many seeds per
//! upstream page, flattened into tagged candidates.
//!
//! ### Suggestion Source
//! The tracker's own ranked feed, for providers that offer one.
//!
//! ## Example Usage
//!
//! ```ignore
//! use sources::{history, BatchRecommendationFetcher, CandidateSource};
//! use std::sync::Arc;
//!
//! let context = history::build_user_context(client.as_ref(), credentials).await?;
//! let seeds = history::fetch_seed_sets(client.as_ref(), &context, 5).await;
//!
//! let fetcher = BatchRecommendationFetcher::new(client.clone()).with_per_seed(10);
//! let recent = fetcher
//!     .fetch_recommendations_for_seeds(&context.credentials, &seeds.recent, CandidateSource::Recent)
//!     .await;
//! ```

// Public modules
pub mod expansion;
pub mod history;
pub mod suggestions;
pub mod types;

// Re-export commonly used types
pub use expansion::BatchRecommendationFetcher;
pub use suggestions::SuggestionSource;
pub use types::{Candidate, CandidateSource, SeedSets, UserContext};

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{Anime, Credentials, Provider, Viewer};

    fn viewer() -> Viewer {
        Viewer {
            id: 3,
            name: "jet".to_string(),
            avatar: None,
            statistics: None,
        }
    }

    #[test]
    fn test_candidate_creation() {
        let candidate = Candidate::from_seed(Anime::new(1, "Trigun"), CandidateSource::TopRated, 9);
        assert_eq!(candidate.id(), 1);
        assert_eq!(candidate.source, CandidateSource::TopRated);
        assert_eq!(candidate.seed, Some(9));
    }

    #[test]
    fn test_user_context_watched_lookup() {
        let credentials = Credentials::new(Provider::Mal, "token", None).unwrap();
        let context = UserContext::new(credentials, viewer());
        assert_eq!(context.has_watched(1), None);

        let context = context.with_watched([1, 2].into_iter().collect());
        assert_eq!(context.has_watched(1), Some(true));
        assert_eq!(context.has_watched(5), Some(false));
    }

    #[test]
    fn test_seed_sets_emptiness() {
        assert!(SeedSets::default().is_empty());
        let sets = SeedSets {
            recent: vec![],
            top_rated: vec![4],
        };
        assert!(!sets.is_empty());
    }
}
