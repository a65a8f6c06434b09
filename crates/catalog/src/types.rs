//! Core domain types shared by every stage of the recommendation pipeline.
//!
//! Everything here is provider-neutral: the provider clients translate their
//! wire payloads into these records at the adapter boundary, so nothing
//! downstream ever sees a nullable GraphQL field or a loosely typed REST
//! object.

use crate::error::{CatalogError, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Type Aliases
// =============================================================================

/// Provider-scoped title identifier (stable within one provider)
pub type AnimeId = u32;

/// A title from the user's own history used to query for related titles
pub type SeedId = AnimeId;

// =============================================================================
// Provider & Credentials
// =============================================================================

/// The two supported anime-tracking services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Mal,
    AniList,
}

impl Provider {
    /// Short tag used by the auth collaborator ("mal" / "anilist")
    pub fn tag(&self) -> &'static str {
        match self {
            Provider::Mal => "mal",
            Provider::AniList => "anilist",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Mal => f.write_str("MyAnimeList"),
            Provider::AniList => f.write_str("AniList"),
        }
    }
}

impl FromStr for Provider {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mal" | "myanimelist" => Ok(Provider::Mal),
            "anilist" | "al" => Ok(Provider::AniList),
            _ => Err(CatalogError::UnknownProvider(s.to_string())),
        }
    }
}

/// Bearer credentials handed over by the auth collaborator.
///
/// Never persisted by this workspace. `Debug` redacts both tokens so they
/// cannot leak through `tracing` fields.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub provider: Provider,
    access_token: String,
    refresh_token: Option<String>,
}

impl Credentials {
    /// Build credentials, rejecting a blank access token
    pub fn new(
        provider: Provider,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
    ) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(CatalogError::MissingAccessToken {
                provider: provider.tag().to_string(),
            });
        }
        let refresh_token = refresh_token.filter(|t| !t.trim().is_empty());
        Ok(Self {
            provider,
            access_token,
            refresh_token,
        })
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Refresh token, carried for adapters that renew silently
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("provider", &self.provider)
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

// =============================================================================
// Closed vocabularies
// =============================================================================

/// Media format, normalized across providers.
///
/// Unknown upstream tokens survive as a capitalized `Other` passthrough
/// instead of failing the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum MediaKind {
    Tv,
    TvShort,
    Movie,
    Special,
    Ova,
    Ona,
    Music,
    Other(String),
}

impl MediaKind {
    pub fn as_str(&self) -> &str {
        match self {
            MediaKind::Tv => "TV",
            MediaKind::TvShort => "TV Short",
            MediaKind::Movie => "Movie",
            MediaKind::Special => "Special",
            MediaKind::Ova => "OVA",
            MediaKind::Ona => "ONA",
            MediaKind::Music => "Music",
            MediaKind::Other(raw) => raw,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<MediaKind> for String {
    fn from(kind: MediaKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Airing lifecycle status, normalized across providers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum AiringStatus {
    FinishedAiring,
    Ongoing,
    NotYetReleased,
    Cancelled,
    Unknown,
    Other(String),
}

impl AiringStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AiringStatus::FinishedAiring => "Finished Airing",
            AiringStatus::Ongoing => "Ongoing",
            AiringStatus::NotYetReleased => "Not Yet Released",
            AiringStatus::Cancelled => "Cancelled",
            AiringStatus::Unknown => "Unknown",
            AiringStatus::Other(raw) => raw,
        }
    }
}

impl fmt::Display for AiringStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<AiringStatus> for String {
    fn from(status: AiringStatus) -> Self {
        status.as_str().to_string()
    }
}

// =============================================================================
// Trailer
// =============================================================================

/// Video hosts we can build playback links for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrailerSite {
    YouTube,
    Dailymotion,
}

/// External trailer reference, serialized as its canonical playback URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct Trailer {
    pub site: TrailerSite,
    pub video_id: String,
}

impl Trailer {
    /// Build from a provider's (site, id) pair; unsupported hosts yield `None`
    pub fn from_site(site: &str, video_id: &str) -> Option<Self> {
        let video_id = video_id.trim();
        if video_id.is_empty() {
            return None;
        }
        let site = if site.eq_ignore_ascii_case("youtube") {
            TrailerSite::YouTube
        } else if site.eq_ignore_ascii_case("dailymotion") {
            TrailerSite::Dailymotion
        } else {
            return None;
        };
        Some(Self {
            site,
            video_id: video_id.to_string(),
        })
    }

    /// Canonical playback URL
    pub fn playback_url(&self) -> String {
        match self.site {
            TrailerSite::YouTube => format!("https://www.youtube.com/watch?v={}", self.video_id),
            TrailerSite::Dailymotion => {
                format!("https://www.dailymotion.com/video/{}", self.video_id)
            }
        }
    }

    /// Autoplaying embed URL for the trailer modal
    pub fn embed_url(&self) -> String {
        match self.site {
            TrailerSite::YouTube => format!(
                "https://www.youtube.com/embed/{}?autoplay=1",
                self.video_id
            ),
            TrailerSite::Dailymotion => format!(
                "https://www.dailymotion.com/embed/video/{}?autoplay=1",
                self.video_id
            ),
        }
    }
}

impl From<Trailer> for String {
    fn from(trailer: Trailer) -> Self {
        trailer.playback_url()
    }
}

// =============================================================================
// Anime - the candidate record
// =============================================================================

/// A normalized recommendation record, ready for the card interface.
///
/// Field names serialize in the camelCase shape the card UI consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Anime {
    pub id: AnimeId,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episodes: Option<u32>,
    pub status: AiringStatus,
    /// Mean score on a 0-10 scale; `None` means unknown, not zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner_image: Option<String>,
    #[serde(rename = "trailerUrl", skip_serializing_if = "Option::is_none")]
    pub trailer: Option<Trailer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation_reason: Option<String>,
}

impl Anime {
    /// Minimal record with every optional field empty
    pub fn new(id: AnimeId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            kind: MediaKind::Other("Unknown".to_string()),
            episodes: None,
            status: AiringStatus::Unknown,
            score: None,
            genres: Vec::new(),
            synopsis: None,
            cover_image: None,
            banner_image: None,
            trailer: None,
            recommendation_reason: None,
        }
    }
}

// =============================================================================
// Viewer profile
// =============================================================================

/// Per-status counts from the user's list
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStatistics {
    pub watching: u32,
    pub completed: u32,
    pub on_hold: u32,
    pub dropped: u32,
    pub plan_to_watch: u32,
    pub episodes: u32,
    pub days_watched: f64,
    /// Mean of the user's own scores, 0-10
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_score: Option<f64>,
}

/// The authenticated user behind a set of credentials
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
    pub id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ListStatistics>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("mal".parse::<Provider>().unwrap(), Provider::Mal);
        assert_eq!(" AniList ".parse::<Provider>().unwrap(), Provider::AniList);
        assert_eq!(
            "xyz".parse::<Provider>(),
            Err(CatalogError::UnknownProvider("xyz".to_string()))
        );
    }

    #[test]
    fn test_credentials_reject_blank_token() {
        let err = Credentials::new(Provider::Mal, "   ", None).unwrap_err();
        assert!(matches!(err, CatalogError::MissingAccessToken { .. }));
    }

    #[test]
    fn test_credentials_debug_redacts_tokens() {
        let creds = Credentials::new(
            Provider::AniList,
            "secret-access",
            Some("secret-refresh".to_string()),
        )
        .unwrap();
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("secret-access"));
        assert!(!printed.contains("secret-refresh"));
        assert_eq!(creds.refresh_token(), Some("secret-refresh"));
    }

    #[test]
    fn test_blank_refresh_token_is_dropped() {
        let creds = Credentials::new(Provider::Mal, "tok", Some(String::new())).unwrap();
        assert_eq!(creds.refresh_token(), None);
    }

    #[test]
    fn test_trailer_urls() {
        let trailer = Trailer::from_site("YouTube", "--IcmZkvL0Q").unwrap();
        assert_eq!(
            trailer.playback_url(),
            "https://www.youtube.com/watch?v=--IcmZkvL0Q"
        );
        assert_eq!(
            trailer.embed_url(),
            "https://www.youtube.com/embed/--IcmZkvL0Q?autoplay=1"
        );
        assert!(Trailer::from_site("vimeo", "123").is_none());
        assert!(Trailer::from_site("youtube", "  ").is_none());
    }

    #[test]
    fn test_anime_serializes_for_card_ui() {
        let mut anime = Anime::new(5114, "Fullmetal Alchemist: Brotherhood");
        anime.kind = MediaKind::Tv;
        anime.status = AiringStatus::FinishedAiring;
        anime.score = Some(9.1);
        anime.trailer = Trailer::from_site("youtube", "--IcmZkvL0Q");

        let json = serde_json::to_value(&anime).unwrap();
        assert_eq!(json["type"], "TV");
        assert_eq!(json["status"], "Finished Airing");
        assert_eq!(json["score"], 9.1);
        assert_eq!(
            json["trailerUrl"],
            "https://www.youtube.com/watch?v=--IcmZkvL0Q"
        );
        assert!(json.get("episodes").is_none());
        assert!(json.get("coverImage").is_none());
    }
}
