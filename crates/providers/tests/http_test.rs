//! HTTP-level tests for the AniList and MyAnimeList clients against a local
//! mock server.

use catalog::{Credentials, Provider, Viewer};
use providers::{AniListClient, AnimeTracker, ClientOptions, MalClient, Pacer, ProviderError};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "token-abc";

fn credentials(provider: Provider) -> Credentials {
    Credentials::new(provider, TOKEN, None).unwrap()
}

fn viewer() -> Viewer {
    Viewer {
        id: 42,
        name: "spike".to_string(),
        avatar: None,
        statistics: None,
    }
}

fn options(base_url: String, timeout: Duration) -> ClientOptions {
    ClientOptions::new(base_url, timeout, Pacer::unpaced())
}

fn mal_client(server: &MockServer) -> MalClient {
    MalClient::new(options(server.uri(), Duration::from_secs(5))).unwrap()
}

fn list_page(ids: &[u32], next: Option<String>) -> Value {
    let data: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "node": { "id": id, "title": format!("Title {id}") } }))
        .collect();
    match next {
        Some(next) => json!({ "data": data, "paging": { "next": next } }),
        None => json!({ "data": data, "paging": {} }),
    }
}

// ============================================================================
// MyAnimeList
// ============================================================================

#[tokio::test]
async fn test_mal_listed_ids_follows_next_pages() {
    let server = MockServer::start().await;
    let list_url = format!("{}/users/@me/animelist", server.uri());

    Mock::given(method("GET"))
        .and(path("/users/@me/animelist"))
        .and(query_param("offset", "2"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(list_page(&[3, 4], Some(format!("{list_url}?offset=4")))),
        )
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/@me/animelist"))
        .and(query_param("offset", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_page(&[5], None)))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/@me/animelist"))
        .and(query_param("limit", "1000"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(list_page(&[1, 2, 3], Some(format!("{list_url}?offset=2")))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ids = mal_client(&server)
        .listed_ids(&credentials(Provider::Mal), &viewer())
        .await
        .unwrap();
    assert_eq!(ids, HashSet::from([1, 2, 3, 4, 5]));
}

#[tokio::test]
async fn test_mal_listed_ids_stops_at_page_cap() {
    let server = MockServer::start().await;
    let next = format!("{}/users/@me/animelist?offset=1", server.uri());

    // Every page points at another one
    Mock::given(method("GET"))
        .and(path("/users/@me/animelist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_page(&[9], Some(next))))
        .expect(20)
        .mount(&server)
        .await;

    let ids = mal_client(&server)
        .listed_ids(&credentials(Provider::Mal), &viewer())
        .await
        .unwrap();
    assert_eq!(ids, HashSet::from([9]));
}

#[tokio::test]
async fn test_mal_foreign_paging_link_not_followed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/@me/animelist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_page(
            &[1, 2],
            Some("http://127.0.0.1:9/users/@me/animelist?offset=2".to_string()),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let ids = mal_client(&server)
        .listed_ids(&credentials(Provider::Mal), &viewer())
        .await
        .unwrap();
    assert_eq!(ids, HashSet::from([1, 2]));
}

#[tokio::test]
async fn test_mal_rejected_token_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "invalid_token" })))
        .mount(&server)
        .await;

    let err = mal_client(&server)
        .viewer(&credentials(Provider::Mal))
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_mal_mark_planned_sends_form() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/anime/5114/my_list_status"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(body_string("status=plan_to_watch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "plan_to_watch" })))
        .expect(1)
        .mount(&server)
        .await;

    mal_client(&server)
        .mark_planned(&credentials(Provider::Mal), 5114)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_timeout_surfaces_as_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/@me/animelist"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(list_page(&[1], None))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = MalClient::new(options(server.uri(), Duration::from_millis(50))).unwrap();
    let err = client
        .listed_ids(&credentials(Provider::Mal), &viewer())
        .await
        .unwrap_err();
    match err {
        ProviderError::Http(e) => assert!(e.is_timeout()),
        other => panic!("expected a transport error, got {other:?}"),
    }
}

// ============================================================================
// AniList
// ============================================================================

#[tokio::test]
async fn test_anilist_posts_query_and_variables() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(body_partial_json(json!({ "variables": { "userId": 42 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "MediaListCollection": {
                    "lists": [
                        { "entries": [ { "media": { "id": 1 } }, { "media": { "id": 2 } } ] },
                        { "entries": [ { "media": { "id": 2 } }, null ] }
                    ]
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AniListClient::new(options(server.uri(), Duration::from_secs(5))).unwrap();
    let ids = client
        .listed_ids(&credentials(Provider::AniList), &viewer())
        .await
        .unwrap();
    assert_eq!(ids, HashSet::from([1, 2]));

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body["query"].as_str().unwrap().contains("MediaListCollection"));
    assert!(body["variables"]["status"].is_null());
}

#[tokio::test]
async fn test_anilist_invalid_token_error_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "data": null,
            "errors": [ { "message": "Invalid token", "status": 400 } ]
        })))
        .mount(&server)
        .await;

    let client = AniListClient::new(options(server.uri(), Duration::from_secs(5))).unwrap();
    let err = client.viewer(&credentials(Provider::AniList)).await.unwrap_err();
    assert!(err.is_unauthorized());
}
