//! Error types for the catalog crate.
//!
//! Only construction of the boundary types can fail here: the normalization
//! functions are total and fall back to passthrough values instead of
//! returning errors.

use thiserror::Error;

/// Errors raised while building catalog values from caller input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Provider tag is not one of the supported trackers
    #[error("Unsupported provider: {0}")]
    UnknownProvider(String),

    /// Credentials were supplied without a usable access token
    #[error("Missing access token for {provider}")]
    MissingAccessToken { provider: String },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, CatalogError>;
