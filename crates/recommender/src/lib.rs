//! Recommendation orchestration for anime-swipe.
//!
//! This crate wires the provider clients, candidate sources and the
//! ranking pipeline into one entry point,
//! [`RecommendationOrchestrator::get_recommendations`], and defines what
//! crosses that boundary: the grouped [`RecommendationSet`], the generic
//! [`PipelineError`], and the env-driven [`PipelineConfig`].

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod set;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use orchestrator::RecommendationOrchestrator;
pub use set::{GroupKind, Recommendation, RecommendationGroup, RecommendationSet};
