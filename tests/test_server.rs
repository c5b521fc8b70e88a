//! HTTP surface tests: routing, error envelopes and headers

use async_trait::async_trait;
use http::{Method, StatusCode};
use http_body_util::BodyExt;
use player_stats_cache::{
    CacheProvider, HeroRegistry, Platform, PlayerTag, Result, StatsDocument, StatsError,
    StatsPipeline, StatsServer, StatsSource,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

struct FakeSource {
    fetches: AtomicUsize,
}

#[async_trait]
impl StatsSource for FakeSource {
    async fn fetch(&self, _platform: Platform, tag: &PlayerTag) -> Result<StatsDocument> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if tag.as_str() == "nobody-1" {
            return Err(StatsError::PlayerNotFound);
        }
        StatsDocument::from_value(json!({
            "name": tag.as_str(),
            "quickPlayStats": {
                "topHeroes": { "ashe": {}, "reaper": {} },
                "careerStats": {
                    "allHeroes": { "game": { "gamesPlayed": 3, "gamesWon": 2 } },
                    "ashe": {},
                    "reaper": {}
                }
            },
            "competitiveStats": {
                "topHeroes": { "ashe": {}, "reaper": {} },
                "careerStats": { "ashe": {}, "reaper": {} }
            },
            "ratings": []
        }))
    }
}

fn server() -> (StatsServer, Arc<FakeSource>) {
    let source = Arc::new(FakeSource {
        fetches: AtomicUsize::new(0),
    });
    let pipeline = StatsPipeline::new(
        CacheProvider::for_uri("memory"),
        source.clone(),
        Arc::new(HeroRegistry::new(["ashe", "reaper"])),
        Duration::from_secs(60),
    );
    let server = StatsServer::new(Arc::new(pipeline)).with_metrics_endpoint(true);
    (server, source)
}

async fn get(server: &StatsServer, path: &str) -> (StatusCode, http::HeaderMap, Vec<u8>) {
    let response = server.respond(&Method::GET, path).await;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

fn json_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn test_complete_view() {
    let (server, _) = server();
    let (status, headers, body) = get(&server, "/v3/stats/pc/cats-11481/complete").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["content-type"], "application/json");

    let doc = json_body(&body);
    assert_eq!(doc["name"], json!("cats-11481"));
    assert_eq!(doc["quickPlayStats"]["games"], json!({ "played": 3, "won": 2 }));
    assert_eq!(doc["rating"], json!(0));
    assert_eq!(doc["ratingIcon"], json!(""));
    assert_eq!(doc["ratings"], json!({}));
}

#[tokio::test]
async fn test_hero_view_filters() {
    let (server, _) = server();
    let (status, _, body) = get(&server, "/v3/stats/pc/cats%2311481/heroes/ashe").await;

    assert_eq!(status, StatusCode::OK);
    let doc = json_body(&body);
    assert!(doc["competitiveStats"]["topHeroes"].get("reaper").is_none());
    assert!(doc["competitiveStats"]["topHeroes"]["ashe"].is_object());
}

#[tokio::test]
async fn test_empty_hero_list_is_rejected_without_fetch() {
    let (server, source) = server();
    let (status, _, body) = get(&server, "/v3/stats/pc/cats-11481/heroes/,,").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_body(&body)["error"].is_string());
    assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_client_errors() {
    let (server, source) = server();

    for path in [
        "/v3/stats/pc/cats/complete",
        "/v3/stats/gamecube/cats-11481/complete",
        "/v9/stats/pc/cats-11481/complete",
    ] {
        let (status, _, body) = get(&server, path).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "path {}", path);
        assert!(json_body(&body)["error"].is_string(), "path {}", path);
    }

    assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_player_not_found() {
    let (server, _) = server();
    let (status, _, body) = get(&server, "/v2/stats/pc/nobody-1/profile").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_body(&body), json!({ "error": "Player not found" }));
}

#[tokio::test]
async fn test_version_route() {
    let (server, _) = server();
    let (status, _, body) = get(&server, "/v1/version").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({ "version": env!("CARGO_PKG_VERSION") }));
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let (server, _) = server();

    let (status, _, body) = get(&server, "/v3/leaderboard").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_body(&body), json!({ "error": "not found" }));

    let response = server
        .respond(&Method::POST, "/v3/stats/pc/cats-11481/complete")
        .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_metrics_and_health() {
    let (server, _) = server();
    get(&server, "/v3/stats/pc/cats-11481/complete").await;
    get(&server, "/v3/stats/pc/cats-11481/complete").await;

    let (status, _, body) = get(&server, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("player_stats_requests_total 2"));
    assert!(text.contains("player_stats_cache_hits_total 1"));

    let (status, _, body) = get(&server, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_metrics_disabled() {
    let source: Arc<dyn StatsSource> = Arc::new(FakeSource {
        fetches: AtomicUsize::new(0),
    });
    let pipeline = StatsPipeline::new(
        CacheProvider::disabled(),
        source,
        Arc::new(HeroRegistry::empty()),
        Duration::ZERO,
    );
    let server = StatsServer::new(Arc::new(pipeline));

    let (status, _, _) = get(&server, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_serve_over_tcp() {
    let (server, _) = server();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(server.serve(listener));

    let response = reqwest::get(format!("http://{}/v3/stats/pc/cats-11481/profile", addr))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let doc: Value = response.json().await.unwrap();
    assert!(doc["quickPlayStats"].get("topHeroes").is_none());
    assert_eq!(doc["quickPlayStats"]["games"]["played"], json!(3));

    handle.abort();
}
