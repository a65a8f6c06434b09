//! Ranking and filtering of anime candidates.
//!
//! This crate provides:
//! - `aggregate` to merge candidate lists into one deduplicated ranked list
//! - the Filter trait and `FilterPipeline` for post-ranking filters
//! - the Watched-Filter stage that drops titles already on the user's list
//!
//! ## Architecture
//! Candidates from one signal (a seed list or a suggestion feed) pass
//! through two stages:
//! 1. Aggregation: dedupe by id and rank by appearance count
//! 2. Filtering: drop what the user has already listed, keeping order
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::watched::{filter_watched, watched_pipeline};
//! use pipeline::{aggregate, WatchedPolicy};
//!
//! let ranked = aggregate(&[recent_candidates]);
//! let kept = filter_watched(client.as_ref(), &mut context, ranked, &watched_pipeline(WatchedPolicy::FailOpen)).await?;
//! ```

pub mod aggregate;
pub mod filter_pipeline;
pub mod filters;
pub mod traits;
pub mod watched;

// Re-export main types
pub use aggregate::{RankedCandidate, aggregate};
pub use filter_pipeline::FilterPipeline;
pub use traits::Filter;
pub use watched::WatchedPolicy;
