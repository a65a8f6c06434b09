//! Filter to remove titles already on the user's list.

use crate::aggregate::RankedCandidate;
use crate::traits::Filter;
use crate::watched::WatchedPolicy;
use anyhow::Result;
use sources::UserContext;
use tracing::warn;

/// Removes candidates present on the user's list in any status.
///
/// ## Algorithm
/// Uses the HashSet in `UserContext::watched` for O(1) lookups. When that
/// set is unknown the policy decides: pass everything or pass nothing.
pub struct AlreadyWatchedFilter {
    policy: WatchedPolicy,
}

impl AlreadyWatchedFilter {
    pub fn new(policy: WatchedPolicy) -> Self {
        Self { policy }
    }
}

impl Default for AlreadyWatchedFilter {
    fn default() -> Self {
        Self::new(WatchedPolicy::default())
    }
}

impl Filter for AlreadyWatchedFilter {
    fn name(&self) -> &str {
        "AlreadyWatchedFilter"
    }

    fn apply(
        &self,
        candidates: Vec<RankedCandidate>,
        context: &UserContext,
    ) -> Result<Vec<RankedCandidate>> {
        if context.watched.is_none() {
            return Ok(match self.policy {
                WatchedPolicy::FailOpen => candidates,
                WatchedPolicy::FailClosed => {
                    warn!(dropped = candidates.len(), "Watched set unknown, withholding candidates");
                    Vec::new()
                }
            });
        }

        Ok(candidates
            .into_iter()
            .filter(|candidate| context.has_watched(candidate.id()) != Some(true))
            .collect())
    }
}
