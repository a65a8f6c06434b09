//! Filter implementations for the candidate pipeline.

pub mod already_watched;

pub use already_watched::AlreadyWatchedFilter;
