//! Shared types for candidate generation.

use catalog::{Anime, AnimeId, Credentials, SeedId, Viewer};
use std::collections::HashSet;
use std::fmt;

/// Which signal produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateSource {
    /// Expanded from the user's most recently updated completed titles
    Recent,
    /// Expanded from the user's highest scored completed titles
    TopRated,
    /// Taken from the provider's own suggestion feed
    Suggested,
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CandidateSource::Recent => "recent",
            CandidateSource::TopRated => "top_rated",
            CandidateSource::Suggested => "suggested",
        };
        f.write_str(label)
    }
}

/// A candidate title paired with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub anime: Anime,
    pub source: CandidateSource,
    /// Seed whose recommendations contained this title; `None` for feeds
    pub seed: Option<SeedId>,
}

impl Candidate {
    pub fn new(anime: Anime, source: CandidateSource) -> Self {
        Self {
            anime,
            source,
            seed: None,
        }
    }

    pub fn from_seed(anime: Anime, source: CandidateSource, seed: SeedId) -> Self {
        Self {
            anime,
            source,
            seed: Some(seed),
        }
    }

    pub fn id(&self) -> AnimeId {
        self.anime.id
    }
}

/// Everything known about the user for one pipeline run
#[derive(Debug, Clone)]
pub struct UserContext {
    pub credentials: Credentials,
    pub viewer: Viewer,
    /// Ids on the user's list in any status; `None` until loaded, or when
    /// the list could not be fetched
    pub watched: Option<HashSet<AnimeId>>,
}

impl UserContext {
    pub fn new(credentials: Credentials, viewer: Viewer) -> Self {
        Self {
            credentials,
            viewer,
            watched: None,
        }
    }

    pub fn with_watched(mut self, watched: HashSet<AnimeId>) -> Self {
        self.watched = Some(watched);
        self
    }

    /// `None` when the watched set is unknown
    pub fn has_watched(&self, anime_id: AnimeId) -> Option<bool> {
        self.watched.as_ref().map(|ids| ids.contains(&anime_id))
    }
}

/// The two seed lists drawn from the user's history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSets {
    pub recent: Vec<SeedId>,
    pub top_rated: Vec<SeedId>,
}

impl SeedSets {
    /// True when neither ordering produced a seed
    pub fn is_empty(&self) -> bool {
        self.recent.is_empty() && self.top_rated.is_empty()
    }
}
