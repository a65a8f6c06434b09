//! Pure normalization helpers used by the provider adapters.
//!
//! Each provider speaks its own vocabulary (AniList: `FINISHED`, `TV_SHORT`,
//! 0-100 scores; MyAnimeList: `finished_airing`, `tv`, 0-10 scores). These
//! functions fold both into the closed vocabularies in [`crate::types`].
//! None of them fail: unknown tokens pass through capitalized.

use crate::types::{AiringStatus, MediaKind};
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));
static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&[A-Za-z0-9#]+;").expect("entity pattern is valid"));
static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Title used when a provider sends no usable title variant at all
pub const FALLBACK_TITLE: &str = "Unknown Title";

// =============================================================================
// Scores
// =============================================================================

/// Native scale of an upstream score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreScale {
    /// Already 0-10 (MyAnimeList `mean`)
    Ten,
    /// 0-100 (AniList `meanScore`)
    Hundred,
}

/// Normalize a score whose scale the caller knows.
///
/// Result is on 0-10, rounded to one decimal. Absent, negative and
/// non-finite inputs yield `None`; zero stays `Some(0.0)`.
pub fn normalize_score_on(raw: Option<f64>, scale: ScoreScale) -> Option<f64> {
    let raw = raw?;
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    let ten = match scale {
        ScoreScale::Ten => raw,
        ScoreScale::Hundred => raw / 10.0,
    };
    Some((ten.min(10.0) * 10.0).round() / 10.0)
}

/// Normalize a score of unknown scale: anything above 10 is read as 0-100.
pub fn normalize_score(raw: Option<f64>) -> Option<f64> {
    let scale = match raw {
        Some(value) if value > 10.0 => ScoreScale::Hundred,
        _ => ScoreScale::Ten,
    };
    normalize_score_on(raw, scale)
}

// =============================================================================
// Vocabularies
// =============================================================================

fn token_key(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .replace([' ', '-'], "_")
}

/// "NOT_YET_RELEASED" -> "Not Yet Released"
fn capitalize_words(raw: &str) -> String {
    raw.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_status(raw: &str) -> AiringStatus {
    match token_key(raw).as_str() {
        "finished" | "finished_airing" => AiringStatus::FinishedAiring,
        "releasing" | "currently_airing" | "airing" | "ongoing" => AiringStatus::Ongoing,
        "not_yet_released" | "not_yet_aired" | "upcoming" => AiringStatus::NotYetReleased,
        "cancelled" | "canceled" => AiringStatus::Cancelled,
        "" | "unknown" => AiringStatus::Unknown,
        _ => AiringStatus::Other(capitalize_words(raw)),
    }
}

pub fn normalize_kind(raw: &str) -> MediaKind {
    match token_key(raw).as_str() {
        "tv" => MediaKind::Tv,
        "tv_short" => MediaKind::TvShort,
        "movie" => MediaKind::Movie,
        "special" | "tv_special" => MediaKind::Special,
        "ova" => MediaKind::Ova,
        "ona" => MediaKind::Ona,
        "music" => MediaKind::Music,
        "" | "unknown" => MediaKind::Other("Unknown".to_string()),
        _ => MediaKind::Other(capitalize_words(raw)),
    }
}

// =============================================================================
// Text
// =============================================================================

/// Strip HTML down to plain text.
///
/// ## Algorithm
/// 1. Replace every `<...>` run with a space
/// 2. Replace every entity (`&nbsp;`, `&#39;`, ...) with a space
/// 3. Collapse whitespace runs to one space and trim
///
/// Replacements are spaces, which can never complete a tag or an entity, so
/// a second pass finds nothing left to change.
pub fn strip_markup(raw: &str) -> String {
    let without_tags = TAG_RE.replace_all(raw, " ");
    let without_entities = ENTITY_RE.replace_all(&without_tags, " ");
    WHITESPACE_RE
        .replace_all(&without_entities, " ")
        .trim()
        .to_string()
}

/// Synopsis cleanup; an empty result counts as absent
pub fn clean_synopsis(raw: Option<&str>) -> Option<String> {
    raw.map(strip_markup).filter(|text| !text.is_empty())
}

/// Pick the display title: localized, then romanized, then native.
pub fn pick_title(localized: Option<&str>, romanized: Option<&str>, native: Option<&str>) -> String {
    [localized, romanized, native]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|title| !title.is_empty())
        .unwrap_or(FALLBACK_TITLE)
        .to_string()
}

/// Drop blank strings that providers send instead of null
pub fn non_blank(raw: Option<String>) -> Option<String> {
    raw.filter(|value| !value.trim().is_empty())
}
