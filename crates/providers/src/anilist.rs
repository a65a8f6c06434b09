//! AniList GraphQL client.
//!
//! Every call is a POST of `{ query, variables }` to the single endpoint with
//! a bearer token. Responses arrive as `{ data: {...}, errors: [...] }`; any
//! nested object may be `null`, so the wire types below are `Option` all the
//! way down and a missing object is read as "not found" rather than as a
//! parse failure.

use crate::error::{ProviderError, ProviderResult};
use crate::{
    AnimeTracker, ClientOptions, Pacer, RecommendationGraph, SeedOrder, SeedRecommendations,
    build_http_client,
};
use async_trait::async_trait;
use catalog::normalize::{self, ScoreScale};
use catalog::{Anime, AnimeId, Credentials, ListStatistics, Provider, SeedId, Trailer, Viewer};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, instrument};

/// Public GraphQL endpoint
pub const ANILIST_ENDPOINT: &str = "https://graphql.anilist.co";

/// AniList caps `Page(perPage:)` at 50
pub const MAX_PAGE_SIZE: usize = 50;

const PROVIDER: Provider = Provider::AniList;

// =============================================================================
// Queries
// =============================================================================

const VIEWER_QUERY: &str = r#"
query {
  Viewer {
    id
    name
    avatar { large }
    statistics {
      anime {
        meanScore
        minutesWatched
        episodesWatched
        statuses { status count }
      }
    }
  }
}
"#;

const LIST_COLLECTION_QUERY: &str = r#"
query ($userId: Int, $status: MediaListStatus, $sort: [MediaListSort]) {
  MediaListCollection(userId: $userId, type: ANIME, status: $status, sort: $sort) {
    lists {
      entries {
        media { id }
      }
    }
  }
}
"#;

const RECOMMENDATIONS_QUERY: &str = r#"
query ($ids: [Int], $perPage: Int, $perSeed: Int) {
  Page(perPage: $perPage) {
    media(id_in: $ids, type: ANIME) {
      id
      recommendations(sort: RATING_DESC, perPage: $perSeed) {
        nodes {
          mediaRecommendation {
            id
            title { english romaji native }
            format
            episodes
            status
            meanScore
            genres
            description(asHtml: false)
            coverImage { large extraLarge }
            bannerImage
            trailer { id site }
          }
        }
      }
    }
  }
}
"#;

const SAVE_PLANNED_MUTATION: &str = r#"
mutation ($mediaId: Int) {
  SaveMediaListEntry(mediaId: $mediaId, status: PLANNING) {
    id
    status
  }
}
"#;

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
    status: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct ViewerData {
    #[serde(rename = "Viewer")]
    viewer: Option<ViewerNode>,
}

#[derive(Debug, Deserialize)]
struct ViewerNode {
    id: u64,
    name: Option<String>,
    avatar: Option<Avatar>,
    statistics: Option<UserStatistics>,
}

#[derive(Debug, Deserialize)]
struct Avatar {
    large: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserStatistics {
    anime: Option<AnimeStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnimeStatistics {
    mean_score: Option<f64>,
    minutes_watched: Option<u64>,
    episodes_watched: Option<u32>,
    statuses: Option<Vec<Option<StatusCount>>>,
}

#[derive(Debug, Deserialize)]
struct StatusCount {
    status: Option<String>,
    count: u32,
}

#[derive(Debug, Deserialize)]
struct ListCollectionData {
    #[serde(rename = "MediaListCollection")]
    collection: Option<ListCollection>,
}

#[derive(Debug, Deserialize)]
struct ListCollection {
    lists: Option<Vec<Option<ListGroup>>>,
}

#[derive(Debug, Deserialize)]
struct ListGroup {
    entries: Option<Vec<Option<ListEntry>>>,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    media: Option<MediaId>,
}

#[derive(Debug, Deserialize)]
struct MediaId {
    id: AnimeId,
}

#[derive(Debug, Deserialize)]
struct PageData {
    #[serde(rename = "Page")]
    page: Option<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    media: Option<Vec<Option<SeedMedia>>>,
}

#[derive(Debug, Deserialize)]
struct SeedMedia {
    id: SeedId,
    recommendations: Option<RecommendationConnection>,
}

#[derive(Debug, Deserialize)]
struct RecommendationConnection {
    nodes: Option<Vec<Option<RecommendationNode>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationNode {
    media_recommendation: Option<MediaNode>,
}

/// A recommended title as AniList sends it
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaNode {
    pub id: AnimeId,
    pub title: Option<MediaTitle>,
    pub format: Option<String>,
    pub episodes: Option<u32>,
    pub status: Option<String>,
    pub mean_score: Option<f64>,
    pub genres: Option<Vec<String>>,
    pub description: Option<String>,
    pub cover_image: Option<CoverImage>,
    pub banner_image: Option<String>,
    pub trailer: Option<TrailerNode>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MediaTitle {
    pub english: Option<String>,
    pub romaji: Option<String>,
    pub native: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverImage {
    pub large: Option<String>,
    pub extra_large: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrailerNode {
    pub id: Option<String>,
    pub site: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SaveData {
    #[serde(rename = "SaveMediaListEntry")]
    entry: Option<SavedEntry>,
}

#[derive(Debug, Deserialize)]
struct SavedEntry {
    id: u64,
}

// =============================================================================
// Adapter
// =============================================================================

/// Fold an AniList media node into the shared candidate record
pub fn normalize_candidate(node: MediaNode) -> Anime {
    let title = node.title.unwrap_or_default();
    let cover = node.cover_image.unwrap_or_default();
    Anime {
        id: node.id,
        title: normalize::pick_title(
            title.english.as_deref(),
            title.romaji.as_deref(),
            title.native.as_deref(),
        ),
        kind: normalize::normalize_kind(node.format.as_deref().unwrap_or_default()),
        episodes: node.episodes,
        status: normalize::normalize_status(node.status.as_deref().unwrap_or_default()),
        score: normalize::normalize_score_on(node.mean_score, ScoreScale::Hundred),
        genres: node.genres.unwrap_or_default(),
        synopsis: normalize::clean_synopsis(node.description.as_deref()),
        cover_image: normalize::non_blank(cover.extra_large).or(normalize::non_blank(cover.large)),
        banner_image: normalize::non_blank(node.banner_image),
        trailer: node
            .trailer
            .and_then(|t| Trailer::from_site(t.site.as_deref()?, t.id.as_deref()?)),
        recommendation_reason: None,
    }
}

fn viewer_from_node(node: ViewerNode) -> Viewer {
    let statistics = node.statistics.and_then(|s| s.anime).map(|anime| {
        let mut stats = ListStatistics {
            episodes: anime.episodes_watched.unwrap_or(0),
            days_watched: (anime.minutes_watched.unwrap_or(0) as f64 / 1440.0 * 10.0).round() / 10.0,
            mean_score: normalize::normalize_score_on(
                anime.mean_score.filter(|score| *score > 0.0),
                ScoreScale::Hundred,
            ),
            ..ListStatistics::default()
        };
        for status in anime.statuses.unwrap_or_default().into_iter().flatten() {
            match status.status.as_deref() {
                Some("CURRENT") | Some("REPEATING") => stats.watching += status.count,
                Some("COMPLETED") => stats.completed += status.count,
                Some("PAUSED") => stats.on_hold += status.count,
                Some("DROPPED") => stats.dropped += status.count,
                Some("PLANNING") => stats.plan_to_watch += status.count,
                _ => {}
            }
        }
        stats
    });

    Viewer {
        id: node.id,
        name: node.name.unwrap_or_default(),
        avatar: node.avatar.and_then(|a| normalize::non_blank(a.large)),
        statistics,
    }
}

/// Media ids across every list of a collection, first occurrence kept
fn collect_media_ids(data: Option<ListCollectionData>) -> Vec<AnimeId> {
    let mut seen = HashSet::new();
    data.and_then(|d| d.collection)
        .and_then(|c| c.lists)
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .flat_map(|group| group.entries.unwrap_or_default())
        .flatten()
        .filter_map(|entry| entry.media.map(|m| m.id))
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Flatten a recommendations page, restoring the caller's seed order
/// (AniList returns `id_in` matches sorted by id).
fn into_seed_recommendations(data: Option<PageData>, seeds: &[SeedId]) -> Vec<SeedRecommendations> {
    let mut position: HashMap<SeedId, usize> = HashMap::new();
    for (index, seed) in seeds.iter().enumerate() {
        position.entry(*seed).or_insert(index);
    }

    let mut grouped: Vec<SeedRecommendations> = data
        .and_then(|d| d.page)
        .and_then(|p| p.media)
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .map(|media| SeedRecommendations {
            seed: media.id,
            titles: media
                .recommendations
                .and_then(|r| r.nodes)
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .filter_map(|node| node.media_recommendation)
                .map(normalize_candidate)
                .collect(),
        })
        .collect();

    grouped.sort_by_key(|group| position.get(&group.seed).copied().unwrap_or(usize::MAX));
    grouped
}

fn graphql_failure(status: StatusCode, errors: Vec<GraphQlError>) -> ProviderError {
    let unauthorized = status == StatusCode::UNAUTHORIZED
        || errors.iter().any(|e| {
            let message = e.message.to_ascii_lowercase();
            e.status == Some(401) || message.contains("invalid token") || message.contains("unauthorized")
        });
    if unauthorized {
        return ProviderError::Unauthorized { provider: PROVIDER };
    }
    if status == StatusCode::TOO_MANY_REQUESTS || errors.iter().any(|e| e.status == Some(429)) {
        return ProviderError::RateLimited { provider: PROVIDER };
    }
    let message = errors
        .into_iter()
        .map(|e| match e.status {
            Some(code) => format!("{} (status {})", e.message, code),
            None => e.message,
        })
        .collect::<Vec<_>>()
        .join("; ");
    ProviderError::Query {
        provider: PROVIDER,
        message,
    }
}

/// Decode the `{ data, errors }` envelope; `Ok(None)` means `data: null`
fn parse_envelope<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> ProviderResult<Option<T>> {
    match serde_json::from_slice::<GraphQlResponse<T>>(body) {
        Ok(envelope) => {
            if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
                return Err(graphql_failure(status, errors));
            }
            if !status.is_success() {
                return Err(ProviderError::from_status(PROVIDER, status, body));
            }
            Ok(envelope.data)
        }
        Err(_) if !status.is_success() => Err(ProviderError::from_status(PROVIDER, status, body)),
        Err(e) => Err(ProviderError::Malformed {
            provider: PROVIDER,
            reason: e.to_string(),
        }),
    }
}

// =============================================================================
// Client
// =============================================================================

/// AniList client. Cheap to clone; clones share the HTTP pool and pacer.
#[derive(Debug, Clone)]
pub struct AniListClient {
    http: reqwest::Client,
    endpoint: String,
    pacer: Pacer,
}

impl AniListClient {
    pub fn new(options: ClientOptions) -> ProviderResult<Self> {
        Ok(Self {
            http: build_http_client(options.timeout)?,
            endpoint: options.base_url,
            pacer: options.pacer,
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        credentials: &Credentials,
        operation: &'static str,
        query: &str,
        variables: Value,
    ) -> ProviderResult<Option<T>> {
        self.pacer.ready().await;
        debug!(operation, "Sending AniList request");

        let body = json!({ "query": query, "variables": variables });
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(credentials.access_token())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(operation, error = %e, "AniList request failed");
                e
            })?;

        let status = response.status();
        let bytes = response.bytes().await?;
        parse_envelope(status, &bytes).map_err(|e| {
            error!(operation, status = status.as_u16(), error = %e, "AniList returned an error");
            e
        })
    }

    async fn list_ids(
        &self,
        credentials: &Credentials,
        viewer: &Viewer,
        status: Option<&str>,
        sort: Option<&str>,
    ) -> ProviderResult<Vec<AnimeId>> {
        let variables = json!({
            "userId": viewer.id,
            "status": status,
            "sort": sort.map(|s| vec![s]),
        });
        let data: Option<ListCollectionData> = self
            .execute(credentials, "MediaListCollection", LIST_COLLECTION_QUERY, variables)
            .await?;
        Ok(collect_media_ids(data))
    }
}

#[async_trait]
impl AnimeTracker for AniListClient {
    fn provider(&self) -> Provider {
        PROVIDER
    }

    #[instrument(skip_all)]
    async fn viewer(&self, credentials: &Credentials) -> ProviderResult<Viewer> {
        let data: Option<ViewerData> = self
            .execute(credentials, "Viewer", VIEWER_QUERY, json!({}))
            .await?;
        data.and_then(|d| d.viewer)
            .map(viewer_from_node)
            .ok_or(ProviderError::NotFound {
                provider: PROVIDER,
                what: "viewer",
            })
    }

    #[instrument(skip(self, credentials, viewer), fields(viewer_id = viewer.id))]
    async fn completed_seeds(
        &self,
        credentials: &Credentials,
        viewer: &Viewer,
        order: SeedOrder,
        limit: usize,
    ) -> ProviderResult<Vec<SeedId>> {
        let sort = match order {
            SeedOrder::Recency => "UPDATED_TIME_DESC",
            SeedOrder::Score => "SCORE_DESC",
        };
        let mut ids = self
            .list_ids(credentials, viewer, Some("COMPLETED"), Some(sort))
            .await?;
        ids.truncate(limit);
        debug!(count = ids.len(), "Fetched AniList seed ids");
        Ok(ids)
    }

    #[instrument(skip(self, credentials, viewer), fields(viewer_id = viewer.id))]
    async fn listed_ids(
        &self,
        credentials: &Credentials,
        viewer: &Viewer,
    ) -> ProviderResult<HashSet<AnimeId>> {
        let ids = self.list_ids(credentials, viewer, None, None).await?;
        Ok(ids.into_iter().collect())
    }

    #[instrument(skip(self, credentials))]
    async fn mark_planned(&self, credentials: &Credentials, anime_id: AnimeId) -> ProviderResult<()> {
        let data: Option<SaveData> = self
            .execute(
                credentials,
                "SaveMediaListEntry",
                SAVE_PLANNED_MUTATION,
                json!({ "mediaId": anime_id }),
            )
            .await?;
        let entry = data.and_then(|d| d.entry).ok_or(ProviderError::NotFound {
            provider: PROVIDER,
            what: "list entry",
        })?;
        debug!(entry_id = entry.id, "Saved AniList planning entry");
        Ok(())
    }
}

#[async_trait]
impl RecommendationGraph for AniListClient {
    fn max_batch_size(&self) -> usize {
        MAX_PAGE_SIZE
    }

    #[instrument(skip(self, credentials, seeds), fields(seeds = seeds.len()))]
    async fn related_titles(
        &self,
        credentials: &Credentials,
        seeds: &[SeedId],
        per_seed: usize,
    ) -> ProviderResult<Vec<SeedRecommendations>> {
        if seeds.is_empty() {
            return Ok(Vec::new());
        }
        let variables = json!({
            "ids": seeds,
            "perPage": seeds.len().min(MAX_PAGE_SIZE),
            "perSeed": per_seed,
        });
        let data: Option<PageData> = self
            .execute(credentials, "Page.recommendations", RECOMMENDATIONS_QUERY, variables)
            .await?;
        Ok(into_seed_recommendations(data, seeds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{AiringStatus, MediaKind};

    const PAGE_FIXTURE: &str = r#"{
      "data": {
        "Page": {
          "media": [
            {
              "id": 5,
              "recommendations": {
                "nodes": [
                  { "mediaRecommendation": {
                      "id": 9253,
                      "title": { "english": "Steins;Gate", "romaji": "Steins;Gate", "native": null },
                      "format": "TV",
                      "episodes": 24,
                      "status": "FINISHED",
                      "meanScore": 89,
                      "genres": ["Drama", "Sci-Fi", "Thriller"],
                      "description": "The self-proclaimed mad scientist<br><br>Rintarou Okabe&nbsp;rents a room.",
                      "coverImage": { "large": "https://img/large.jpg", "extraLarge": "https://img/xl.jpg" },
                      "bannerImage": "https://img/banner.jpg",
                      "trailer": { "id": "uMYhjVwp0Fk", "site": "youtube" }
                  } },
                  { "mediaRecommendation": null }
                ]
              }
            },
            {
              "id": 20,
              "recommendations": {
                "nodes": [
                  { "mediaRecommendation": {
                      "id": 1,
                      "title": { "english": null, "romaji": "Cowboy Bebop", "native": "カウボーイビバップ" },
                      "format": "TV",
                      "episodes": null,
                      "status": "HIATUS",
                      "meanScore": null,
                      "genres": null,
                      "description": null,
                      "coverImage": { "large": "https://img/bebop.jpg", "extraLarge": "" },
                      "bannerImage": null,
                      "trailer": null
                  } }
                ]
              }
            },
            null
          ]
        }
      }
    }"#;

    fn parse_page(body: &str) -> ProviderResult<Option<PageData>> {
        parse_envelope(StatusCode::OK, body.as_bytes())
    }

    #[test]
    fn test_page_restores_seed_order() {
        let data = parse_page(PAGE_FIXTURE).unwrap();
        // Upstream listed seed 5 before 20, the caller asked for 20 first
        let grouped = into_seed_recommendations(data, &[20, 5]);
        let seeds: Vec<SeedId> = grouped.iter().map(|g| g.seed).collect();
        assert_eq!(seeds, vec![20, 5]);
        assert_eq!(grouped[1].titles.len(), 1);
    }

    #[test]
    fn test_normalize_candidate_full_record() {
        let data = parse_page(PAGE_FIXTURE).unwrap();
        let grouped = into_seed_recommendations(data, &[5, 20]);
        let anime = &grouped[0].titles[0];

        assert_eq!(anime.id, 9253);
        assert_eq!(anime.title, "Steins;Gate");
        assert_eq!(anime.kind, MediaKind::Tv);
        assert_eq!(anime.episodes, Some(24));
        assert_eq!(anime.status, AiringStatus::FinishedAiring);
        assert_eq!(anime.score, Some(8.9));
        assert_eq!(anime.genres, vec!["Drama", "Sci-Fi", "Thriller"]);
        assert_eq!(
            anime.synopsis.as_deref(),
            Some("The self-proclaimed mad scientist Rintarou Okabe rents a room.")
        );
        assert_eq!(anime.cover_image.as_deref(), Some("https://img/xl.jpg"));
        assert_eq!(
            anime.trailer.as_ref().map(|t| t.playback_url()),
            Some("https://www.youtube.com/watch?v=uMYhjVwp0Fk".to_string())
        );
    }

    #[test]
    fn test_normalize_candidate_sparse_record() {
        let data = parse_page(PAGE_FIXTURE).unwrap();
        let grouped = into_seed_recommendations(data, &[5, 20]);
        let anime = &grouped[1].titles[0];

        assert_eq!(anime.title, "Cowboy Bebop");
        assert_eq!(anime.status, AiringStatus::Other("Hiatus".to_string()));
        assert_eq!(anime.score, None);
        assert!(anime.genres.is_empty());
        assert_eq!(anime.synopsis, None);
        // Blank extraLarge falls back to large
        assert_eq!(anime.cover_image.as_deref(), Some("https://img/bebop.jpg"));
        assert!(anime.trailer.is_none());
    }

    #[test]
    fn test_missing_page_is_not_found_not_error() {
        let data = parse_page(r#"{ "data": { "Page": null } }"#).unwrap();
        assert!(into_seed_recommendations(data, &[1]).is_empty());

        let data = parse_page(r#"{ "data": null }"#).unwrap();
        assert!(into_seed_recommendations(data, &[1]).is_empty());
    }

    #[test]
    fn test_invalid_token_maps_to_unauthorized() {
        let body = r#"{ "data": null, "errors": [ { "message": "Invalid token", "status": 400 } ] }"#;
        let err = parse_envelope::<ViewerData>(StatusCode::BAD_REQUEST, body.as_bytes()).unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_graphql_errors_are_query_failures() {
        let body = r#"{ "data": null, "errors": [ { "message": "Validation error", "status": 400 } ] }"#;
        let err = parse_envelope::<PageData>(StatusCode::BAD_REQUEST, body.as_bytes()).unwrap_err();
        assert!(matches!(err, ProviderError::Query { .. }));
    }

    #[test]
    fn test_non_json_bodies() {
        let err = parse_envelope::<PageData>(StatusCode::INTERNAL_SERVER_ERROR, b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 500, .. }));

        let err = parse_envelope::<PageData>(StatusCode::OK, b"not json").unwrap_err();
        assert!(matches!(err, ProviderError::Malformed { .. }));
    }

    #[test]
    fn test_collect_media_ids_flattens_and_dedupes() {
        let body = r#"{ "data": { "MediaListCollection": { "lists": [
            { "entries": [ { "media": { "id": 3 } }, { "media": { "id": 1 } } ] },
            null,
            { "entries": [ { "media": { "id": 1 } }, { "media": null }, { "media": { "id": 7 } } ] }
        ] } } }"#;
        let data = parse_envelope::<ListCollectionData>(StatusCode::OK, body.as_bytes()).unwrap();
        assert_eq!(collect_media_ids(data), vec![3, 1, 7]);
    }

    #[test]
    fn test_viewer_statistics() {
        let body = r#"{ "data": { "Viewer": {
            "id": 42,
            "name": "spike",
            "avatar": { "large": "https://img/avatar.png" },
            "statistics": { "anime": {
                "meanScore": 78.4,
                "minutesWatched": 14400,
                "episodesWatched": 600,
                "statuses": [
                    { "status": "CURRENT", "count": 3 },
                    { "status": "COMPLETED", "count": 120 },
                    { "status": "PLANNING", "count": 40 },
                    { "status": "REPEATING", "count": 1 }
                ]
            } }
        } } }"#;
        let data = parse_envelope::<ViewerData>(StatusCode::OK, body.as_bytes()).unwrap();
        let viewer = viewer_from_node(data.unwrap().viewer.unwrap());

        assert_eq!(viewer.id, 42);
        assert_eq!(viewer.name, "spike");
        let stats = viewer.statistics.unwrap();
        assert_eq!(stats.watching, 4);
        assert_eq!(stats.completed, 120);
        assert_eq!(stats.plan_to_watch, 40);
        assert_eq!(stats.days_watched, 10.0);
        assert_eq!(stats.mean_score, Some(7.8));
    }
}
