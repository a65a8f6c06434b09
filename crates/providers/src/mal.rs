//! MyAnimeList v2 REST client.
//!
//! MAL exposes its own ranked suggestion feed, so this client implements
//! [`SuggestionFeed`] instead of a seed-expansion graph. List endpoints are
//! paged through `paging.next`, an absolute URL that is only followed while
//! it stays under the configured API root.

use crate::error::{ProviderError, ProviderResult};
use crate::{AnimeTracker, ClientOptions, Pacer, SeedOrder, SuggestionFeed, build_http_client};
use async_trait::async_trait;
use catalog::normalize::{self, ScoreScale};
use catalog::{Anime, AnimeId, Credentials, ListStatistics, Provider, SeedId, Viewer};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use tracing::{debug, error, instrument, warn};

/// Public v2 API root
pub const MAL_API_URL: &str = "https://api.myanimelist.net/v2";

/// Upstream cap on `/anime/suggestions?limit=`
pub const MAX_SUGGESTIONS: usize = 100;

/// Upstream cap on `/users/@me/animelist?limit=`
const MAX_LIST_PAGE: usize = 1000;

/// Stop following `paging.next` after this many pages
const MAX_LIST_PAGES: usize = 20;

const NODE_FIELDS: &str =
    "id,title,main_picture,alternative_titles,media_type,num_episodes,status,mean,genres,synopsis";

const PROVIDER: Provider = Provider::Mal;

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct UserNode {
    id: u64,
    name: Option<String>,
    picture: Option<String>,
    anime_statistics: Option<UserAnimeStatistics>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserAnimeStatistics {
    num_items_watching: u32,
    num_items_completed: u32,
    num_items_on_hold: u32,
    num_items_dropped: u32,
    num_items_plan_to_watch: u32,
    num_episodes: u32,
    num_days_watched: f64,
    mean_score: f64,
}

#[derive(Debug, Deserialize)]
struct NodePage {
    #[serde(default)]
    data: Vec<NodeEdge>,
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct NodeEdge {
    node: AnimeNode,
}

#[derive(Debug, Deserialize)]
struct Paging {
    next: Option<String>,
}

/// An anime as MAL sends it
#[derive(Debug, Deserialize)]
pub struct AnimeNode {
    pub id: AnimeId,
    pub title: Option<String>,
    pub main_picture: Option<Picture>,
    pub alternative_titles: Option<AlternativeTitles>,
    pub media_type: Option<String>,
    pub num_episodes: Option<u32>,
    pub status: Option<String>,
    pub mean: Option<f64>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    pub synopsis: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Picture {
    pub medium: Option<String>,
    pub large: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlternativeTitles {
    pub en: Option<String>,
    pub ja: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Genre {
    pub name: String,
}

// =============================================================================
// Adapter
// =============================================================================

/// Fold a MAL anime node into the shared candidate record
pub fn normalize_candidate(node: AnimeNode) -> Anime {
    let alternative = node.alternative_titles.unwrap_or_default();
    let picture = node.main_picture.unwrap_or_default();
    Anime {
        id: node.id,
        title: normalize::pick_title(
            alternative.en.as_deref(),
            node.title.as_deref(),
            alternative.ja.as_deref(),
        ),
        kind: normalize::normalize_kind(node.media_type.as_deref().unwrap_or_default()),
        // MAL reports 0 episodes while the count is unknown
        episodes: node.num_episodes.filter(|count| *count > 0),
        status: normalize::normalize_status(node.status.as_deref().unwrap_or_default()),
        score: normalize::normalize_score_on(node.mean, ScoreScale::Ten),
        genres: node.genres.into_iter().map(|g| g.name).collect(),
        synopsis: normalize::clean_synopsis(node.synopsis.as_deref()),
        cover_image: normalize::non_blank(picture.large).or(normalize::non_blank(picture.medium)),
        banner_image: None,
        trailer: None,
        recommendation_reason: None,
    }
}

fn viewer_from_node(node: UserNode) -> Viewer {
    let statistics = node.anime_statistics.map(|s| ListStatistics {
        watching: s.num_items_watching,
        completed: s.num_items_completed,
        on_hold: s.num_items_on_hold,
        dropped: s.num_items_dropped,
        plan_to_watch: s.num_items_plan_to_watch,
        episodes: s.num_episodes,
        days_watched: (s.num_days_watched * 10.0).round() / 10.0,
        mean_score: normalize::normalize_score_on(
            Some(s.mean_score).filter(|score| *score > 0.0),
            ScoreScale::Ten,
        ),
    });
    Viewer {
        id: node.id,
        name: node.name.unwrap_or_default(),
        avatar: normalize::non_blank(node.picture),
        statistics,
    }
}

/// Decode a JSON body, mapping non-2xx statuses first
fn decode<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> ProviderResult<T> {
    if !status.is_success() {
        return Err(ProviderError::from_status(PROVIDER, status, body));
    }
    serde_json::from_slice(body).map_err(|e| ProviderError::Malformed {
        provider: PROVIDER,
        reason: e.to_string(),
    })
}

// =============================================================================
// Client
// =============================================================================

/// MyAnimeList client. Clones share the HTTP pool and pacer.
#[derive(Debug, Clone)]
pub struct MalClient {
    http: reqwest::Client,
    base_url: String,
    pacer: Pacer,
}

impl MalClient {
    pub fn new(options: ClientOptions) -> ProviderResult<Self> {
        Ok(Self {
            http: build_http_client(options.timeout)?,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            pacer: options.pacer,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// True when `url` points at or below the configured API root
    fn is_api_url(&self, url: &str) -> bool {
        url.strip_prefix(&self.base_url)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        credentials: &Credentials,
        url: &str,
        query: &[(&str, String)],
    ) -> ProviderResult<T> {
        self.pacer.ready().await;
        debug!(url, "Sending MyAnimeList request");

        let response = self
            .http
            .get(url)
            .bearer_auth(credentials.access_token())
            .query(query)
            .send()
            .await
            .map_err(|e| {
                error!(url, error = %e, "MyAnimeList request failed");
                e
            })?;
        let status = response.status();
        let bytes = response.bytes().await?;
        decode(status, &bytes).map_err(|e| {
            error!(url, status = status.as_u16(), error = %e, "MyAnimeList returned an error");
            e
        })
    }
}

#[async_trait]
impl AnimeTracker for MalClient {
    fn provider(&self) -> Provider {
        PROVIDER
    }

    #[instrument(skip_all)]
    async fn viewer(&self, credentials: &Credentials) -> ProviderResult<Viewer> {
        let url = self.url("/users/@me");
        let node: UserNode = self
            .get(credentials, &url, &[("fields", "anime_statistics".to_string())])
            .await?;
        Ok(viewer_from_node(node))
    }

    #[instrument(skip(self, credentials, _viewer))]
    async fn completed_seeds(
        &self,
        credentials: &Credentials,
        _viewer: &Viewer,
        order: SeedOrder,
        limit: usize,
    ) -> ProviderResult<Vec<SeedId>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let sort = match order {
            SeedOrder::Recency => "list_updated_at",
            SeedOrder::Score => "list_score",
        };
        let url = self.url("/users/@me/animelist");
        let page: NodePage = self
            .get(
                credentials,
                &url,
                &[
                    ("status", "completed".to_string()),
                    ("sort", sort.to_string()),
                    ("limit", limit.min(MAX_LIST_PAGE).to_string()),
                    ("fields", "list_status".to_string()),
                ],
            )
            .await?;

        let mut seen = HashSet::new();
        let mut ids: Vec<SeedId> = page
            .data
            .into_iter()
            .map(|edge| edge.node.id)
            .filter(|id| seen.insert(*id))
            .collect();
        ids.truncate(limit);
        Ok(ids)
    }

    #[instrument(skip(self, credentials, _viewer))]
    async fn listed_ids(
        &self,
        credentials: &Credentials,
        _viewer: &Viewer,
    ) -> ProviderResult<HashSet<AnimeId>> {
        let mut ids = HashSet::new();
        let first = self.url("/users/@me/animelist");
        let mut page: NodePage = self
            .get(
                credentials,
                &first,
                &[
                    ("limit", MAX_LIST_PAGE.to_string()),
                    ("fields", "list_status".to_string()),
                    ("nsfw", "true".to_string()),
                ],
            )
            .await?;

        let mut pages = 1;
        loop {
            ids.extend(page.data.iter().map(|edge| edge.node.id));
            let Some(next) = page.paging.and_then(|p| p.next) else {
                break;
            };
            if !self.is_api_url(&next) {
                warn!(next, "Paging link leaves the API root, stopping early");
                break;
            }
            if pages >= MAX_LIST_PAGES {
                warn!(pages, "MyAnimeList list exceeds page cap, stopping early");
                break;
            }
            page = self.get(credentials, &next, &[]).await?;
            pages += 1;
        }

        debug!(count = ids.len(), pages, "Fetched MyAnimeList listed ids");
        Ok(ids)
    }

    #[instrument(skip(self, credentials))]
    async fn mark_planned(&self, credentials: &Credentials, anime_id: AnimeId) -> ProviderResult<()> {
        self.pacer.ready().await;
        let url = self.url(&format!("/anime/{anime_id}/my_list_status"));
        let response = self
            .http
            .patch(&url)
            .bearer_auth(credentials.access_token())
            .form(&[("status", "plan_to_watch")])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await?;
            return Err(ProviderError::from_status(PROVIDER, status, &body));
        }
        Ok(())
    }
}

#[async_trait]
impl SuggestionFeed for MalClient {
    #[instrument(skip(self, credentials))]
    async fn suggestions(&self, credentials: &Credentials, limit: usize) -> ProviderResult<Vec<Anime>> {
        let limit = limit.min(MAX_SUGGESTIONS);
        if limit == 0 {
            return Ok(Vec::new());
        }
        let url = self.url("/anime/suggestions");
        let page: NodePage = self
            .get(
                credentials,
                &url,
                &[("limit", limit.to_string()), ("fields", NODE_FIELDS.to_string())],
            )
            .await?;
        let titles: Vec<Anime> = page
            .data
            .into_iter()
            .map(|edge| normalize_candidate(edge.node))
            .collect();
        debug!(count = titles.len(), "Fetched MyAnimeList suggestions");
        Ok(titles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{AiringStatus, MediaKind};

    const SUGGESTIONS_FIXTURE: &str = r#"{
      "data": [
        { "node": {
            "id": 5114,
            "title": "Hagane no Renkinjutsushi: Fullmetal Alchemist",
            "main_picture": { "medium": "https://cdn/m.jpg", "large": "https://cdn/l.jpg" },
            "alternative_titles": { "synonyms": ["FMA"], "en": "Fullmetal Alchemist: Brotherhood", "ja": "鋼の錬金術師" },
            "media_type": "tv",
            "num_episodes": 64,
            "status": "finished_airing",
            "mean": 9.1,
            "genres": [ { "id": 1, "name": "Action" }, { "id": 2, "name": "Adventure" } ],
            "synopsis": "After a horrific alchemy experiment goes wrong...\n\n[Written by MAL Rewrite]"
        } },
        { "node": {
            "id": 52991,
            "title": "Sousou no Frieren",
            "main_picture": { "medium": "https://cdn/frieren.jpg" },
            "alternative_titles": { "en": "" },
            "media_type": "tv",
            "num_episodes": 0,
            "status": "currently_airing"
        } }
      ],
      "paging": {}
    }"#;

    #[test]
    fn test_normalize_suggestions() {
        let page: NodePage = decode(StatusCode::OK, SUGGESTIONS_FIXTURE.as_bytes()).unwrap();
        let titles: Vec<Anime> = page.data.into_iter().map(|e| normalize_candidate(e.node)).collect();

        let fma = &titles[0];
        assert_eq!(fma.title, "Fullmetal Alchemist: Brotherhood");
        assert_eq!(fma.kind, MediaKind::Tv);
        assert_eq!(fma.episodes, Some(64));
        assert_eq!(fma.status, AiringStatus::FinishedAiring);
        assert_eq!(fma.score, Some(9.1));
        assert_eq!(fma.genres, vec!["Action", "Adventure"]);
        assert_eq!(fma.cover_image.as_deref(), Some("https://cdn/l.jpg"));
        assert!(fma.synopsis.as_deref().unwrap().starts_with("After a horrific"));

        let frieren = &titles[1];
        // Blank English title falls back to the romanized one
        assert_eq!(frieren.title, "Sousou no Frieren");
        assert_eq!(frieren.episodes, None);
        assert_eq!(frieren.status, AiringStatus::Ongoing);
        assert_eq!(frieren.score, None);
        assert!(frieren.genres.is_empty());
        assert_eq!(frieren.cover_image.as_deref(), Some("https://cdn/frieren.jpg"));
    }

    #[test]
    fn test_paging_next_is_read() {
        let body = r#"{ "data": [ { "node": { "id": 1, "title": "Cowboy Bebop" } } ],
                        "paging": { "next": "https://api.myanimelist.net/v2/users/@me/animelist?offset=1000" } }"#;
        let page: NodePage = decode(StatusCode::OK, body.as_bytes()).unwrap();
        assert_eq!(page.data.len(), 1);
        assert!(page.paging.and_then(|p| p.next).unwrap().contains("offset=1000"));
    }

    #[test]
    fn test_paging_links_stay_under_api_root() {
        let client = MalClient::new(ClientOptions::new(
            "https://api.myanimelist.net/v2/",
            std::time::Duration::from_secs(1),
            Pacer::unpaced(),
        ))
        .unwrap();
        assert!(client.is_api_url("https://api.myanimelist.net/v2/users/@me/animelist?offset=1000"));
        assert!(client.is_api_url("https://api.myanimelist.net/v2?offset=5"));
        assert!(!client.is_api_url("https://api.myanimelist.net/v2.evil.example/users"));
        assert!(!client.is_api_url("https://evil.example/v2/users/@me/animelist"));
        assert!(!client.is_api_url("http://api.myanimelist.net/v2/users/@me/animelist"));
    }

    #[test]
    fn test_viewer_statistics() {
        let body = r#"{
          "id": 7,
          "name": "faye",
          "picture": "https://cdn/faye.jpg",
          "anime_statistics": {
            "num_items_watching": 2,
            "num_items_completed": 310,
            "num_items_on_hold": 4,
            "num_items_dropped": 9,
            "num_items_plan_to_watch": 51,
            "num_days_watched": 95.678,
            "num_episodes": 5120,
            "mean_score": 7.42
          }
        }"#;
        let node: UserNode = decode(StatusCode::OK, body.as_bytes()).unwrap();
        let viewer = viewer_from_node(node);
        assert_eq!(viewer.name, "faye");
        let stats = viewer.statistics.unwrap();
        assert_eq!(stats.completed, 310);
        assert_eq!(stats.plan_to_watch, 51);
        assert_eq!(stats.days_watched, 95.7);
        assert_eq!(stats.mean_score, Some(7.4));
    }

    #[test]
    fn test_unscored_viewer_has_no_mean() {
        let body = r#"{ "id": 7, "name": "faye", "anime_statistics": { "mean_score": 0.0 } }"#;
        let node: UserNode = decode(StatusCode::OK, body.as_bytes()).unwrap();
        let stats = viewer_from_node(node).statistics.unwrap();
        assert_eq!(stats.mean_score, None);
        assert_eq!(stats.completed, 0);
    }

    #[test]
    fn test_invalid_token_is_unauthorized() {
        let body = br#"{"error":"invalid_token"}"#;
        let err = decode::<NodePage>(StatusCode::UNAUTHORIZED, body).unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_malformed_success_body() {
        let err = decode::<NodePage>(StatusCode::OK, b"{\"data\": 12}").unwrap_err();
        assert!(matches!(err, ProviderError::Malformed { .. }));
    }
}
