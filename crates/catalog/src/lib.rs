//! # Catalog Crate
//!
//! Provider-neutral domain types for the anime recommendation pipeline and
//! the pure functions that fold provider payloads into them.
//!
//! ## Main Components
//!
//! - **types**: `Anime` (the candidate record), `MediaKind`, `AiringStatus`,
//!   `Trailer`, `Provider`, `Credentials`, `Viewer`
//! - **normalize**: score, status, kind, title and markup normalization
//! - **error**: errors raised while building boundary values
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::{normalize, Credentials, Provider};
//!
//! let provider: Provider = "anilist".parse()?;
//! let credentials = Credentials::new(provider, token, None)?;
//!
//! assert_eq!(normalize::normalize_score(Some(85.0)), Some(8.5));
//! assert_eq!(normalize::strip_markup("<b>Hi</b>&nbsp;there"), "Hi there");
//! ```

// Public modules
pub mod error;
pub mod normalize;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{CatalogError, Result};
pub use normalize::ScoreScale;
pub use types::{
    // Type aliases
    AnimeId,
    SeedId,
    // Core types
    Anime,
    Credentials,
    ListStatistics,
    Trailer,
    Viewer,
    // Enums
    AiringStatus,
    MediaKind,
    Provider,
    TrailerSite,
};
