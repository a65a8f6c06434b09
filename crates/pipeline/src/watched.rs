//! Watched-Filter stage: load the user's list once, then drop titles
//! already on it.

use crate::aggregate::RankedCandidate;
use crate::filter_pipeline::FilterPipeline;
use crate::filters::AlreadyWatchedFilter;
use anyhow::Result;
use providers::AnimeTracker;
use serde::Deserialize;
use sources::UserContext;
use std::fmt;
use tracing::{debug, instrument, warn};

/// What the Watched-Filter does when the user's list cannot be fetched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchedPolicy {
    /// Pass candidates through unfiltered
    #[default]
    FailOpen,
    /// Withhold every candidate
    FailClosed,
}

impl fmt::Display for WatchedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchedPolicy::FailOpen => f.write_str("fail_open"),
            WatchedPolicy::FailClosed => f.write_str("fail_closed"),
        }
    }
}

/// Fill `context.watched` from the tracker; leaves it `None` on failure
#[instrument(skip_all, fields(provider = %tracker.provider()))]
pub async fn load_watched<T>(tracker: &T, context: &mut UserContext)
where
    T: AnimeTracker + ?Sized,
{
    match tracker.listed_ids(&context.credentials, &context.viewer).await {
        Ok(ids) => {
            debug!(count = ids.len(), "Loaded watched set");
            context.watched = Some(ids);
        }
        Err(e) => {
            warn!(error = %e, "Could not load watched set");
            context.watched = None;
        }
    }
}

/// The filter set applied to every recommendation path
pub fn watched_pipeline(policy: WatchedPolicy) -> FilterPipeline {
    FilterPipeline::new().add_filter(AlreadyWatchedFilter::new(policy))
}

/// Run `filters` over the candidates, order preserved.
///
/// Loads the user's list if the context does not carry it yet; what
/// happens when it cannot be loaded is up to the filters' policy.
pub async fn filter_watched<T>(
    tracker: &T,
    context: &mut UserContext,
    candidates: Vec<RankedCandidate>,
    filters: &FilterPipeline,
) -> Result<Vec<RankedCandidate>>
where
    T: AnimeTracker + ?Sized,
{
    if context.watched.is_none() {
        load_watched(tracker, context).await;
    }
    filters.apply(candidates, context)
}
