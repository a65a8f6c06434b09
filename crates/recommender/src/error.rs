//! Errors surfaced to callers of the orchestrator.
//!
//! Messages stay generic; upstream detail only reaches the logs.

use catalog::{CatalogError, Provider};
use providers::ProviderError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Token missing, or rejected by the provider while resolving the user
    #[error("{provider} credentials are missing or invalid")]
    InvalidCredentials { provider: Provider },

    /// No provider tag was given
    #[error("provider is missing")]
    MissingProvider,

    /// Every signal source failed or came back empty
    #[error("no recommendation signal available from {provider}")]
    NoSignal { provider: Provider },

    /// A single upstream action (profile, list update) failed
    #[error("{provider} request failed")]
    Upstream { provider: Provider },

    /// Pipeline stage failed internally
    #[error("recommendation pipeline failed")]
    Internal,
}

impl PipelineError {
    /// Classify a provider failure, keeping only the provider name
    pub(crate) fn from_provider(provider: Provider, error: &ProviderError) -> Self {
        if error.is_unauthorized() {
            PipelineError::InvalidCredentials { provider }
        } else {
            PipelineError::Upstream { provider }
        }
    }

    pub(crate) fn from_catalog(provider: Provider, error: &CatalogError) -> Self {
        match error {
            CatalogError::MissingAccessToken { .. } => PipelineError::InvalidCredentials { provider },
            CatalogError::UnknownProvider(_) => PipelineError::Internal,
        }
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, PipelineError>;
