//! Core traits for the filtering pipeline.
//!
//! This module defines the Filter trait that allows composable,
//! extensible filters to be applied to ranked candidates.

use crate::aggregate::RankedCandidate;
use anyhow::Result;
use sources::UserContext;

/// Core trait for filtering candidates.
///
/// Filters run after aggregation, so they must keep the relative order of
/// the candidates they let through.
pub trait Filter: Send + Sync {
    /// Returns the name of this filter (for logging/debugging)
    fn name(&self) -> &str;

    /// Apply this filter to a ranked list.
    ///
    /// # Arguments
    /// * `candidates` - The candidates to filter (takes ownership)
    /// * `context` - User context carrying credentials and the watched set
    ///
    /// # Returns
    /// * `Ok(Vec<RankedCandidate>)` - The surviving candidates, order kept
    /// * `Err` - If filtering fails
    fn apply(
        &self,
        candidates: Vec<RankedCandidate>,
        context: &UserContext,
    ) -> Result<Vec<RankedCandidate>>;
}
