//! History Fetcher - seed titles from the user's own list
//!
//! ## Algorithm
//! 1. Resolve the authenticated viewer (fatal on failure)
//! 2. Fetch the completed list twice, sorted by recency and by score
//! 3. Dedupe each list preserving order and cap it at the seed limit
//! 4. A failed ordering degrades to an empty list; the caller decides
//!    whether the remaining signal is enough

use crate::types::{SeedSets, UserContext};
use catalog::{Credentials, SeedId};
use providers::{AnimeTracker, ProviderResult, SeedOrder};
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

/// Default number of seeds drawn per ordering
pub const DEFAULT_SEED_LIMIT: usize = 5;

/// Resolve the viewer behind `credentials` into a fresh context
#[instrument(skip_all, fields(provider = %tracker.provider()))]
pub async fn build_user_context<T>(tracker: &T, credentials: Credentials) -> ProviderResult<UserContext>
where
    T: AnimeTracker + ?Sized,
{
    let viewer = tracker.viewer(&credentials).await?;
    debug!(viewer_id = viewer.id, "Resolved viewer");
    Ok(UserContext::new(credentials, viewer))
}

/// Completed titles in `order`, deduped and truncated to `limit`
#[instrument(skip(tracker, context), fields(provider = %tracker.provider()))]
pub async fn fetch_seed_ids<T>(
    tracker: &T,
    context: &UserContext,
    order: SeedOrder,
    limit: usize,
) -> ProviderResult<Vec<SeedId>>
where
    T: AnimeTracker + ?Sized,
{
    let raw = tracker
        .completed_seeds(&context.credentials, &context.viewer, order, limit)
        .await?;

    let mut seen = HashSet::new();
    let mut seeds: Vec<SeedId> = raw.into_iter().filter(|id| seen.insert(*id)).collect();
    seeds.truncate(limit);

    debug!(?order, count = seeds.len(), "Fetched seed ids");
    Ok(seeds)
}

/// Fetch both orderings concurrently, substituting an empty list for any
/// ordering that fails
pub async fn fetch_seed_sets<T>(tracker: &T, context: &UserContext, limit: usize) -> SeedSets
where
    T: AnimeTracker + ?Sized,
{
    let (recent, top_rated) = tokio::join!(
        fetch_seed_ids(tracker, context, SeedOrder::Recency, limit),
        fetch_seed_ids(tracker, context, SeedOrder::Score, limit),
    );

    SeedSets {
        recent: recent.unwrap_or_else(|e| {
            warn!(error = %e, "Recent seed fetch failed, continuing without it");
            Vec::new()
        }),
        top_rated: top_rated.unwrap_or_else(|e| {
            warn!(error = %e, "Top rated seed fetch failed, continuing without it");
            Vec::new()
        }),
    }
}
