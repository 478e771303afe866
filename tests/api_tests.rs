use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use goatsquad_feed::{
    api::{create_router, AppState},
    error::{AppError, AppResult},
    models::{
        FeedQuery, HighlightMetadata, Identity, RawRecommendation, SourcePage, UnresolvedPolicy,
    },
    services::{
        providers::{HighlightFetcher, RecommendationSource},
        FeedSources,
    },
};

/// Five reels per page, `pages` pages in total; a search narrows it to one page
struct PagedSource {
    tag: &'static str,
    pages: u32,
}

#[async_trait::async_trait]
impl RecommendationSource for PagedSource {
    async fn fetch_page(&self, page: u32, query: FeedQuery) -> AppResult<SourcePage> {
        if self.tag == "m" && query.identity.is_none() {
            return Err(AppError::Unauthorized("no identity".into()));
        }
        let (prefix, pages) = match &query.search {
            Some(search) => (format!("{}-{}", self.tag, search), 1),
            None => (self.tag.to_string(), self.pages),
        };
        Ok(SourcePage {
            items: (0..5)
                .map(|i| RawRecommendation::new(format!("{}-{}-{}", prefix, page, i)).with_score(3.5))
                .collect(),
            has_more: page < pages,
        })
    }
}

struct EchoHighlights;

#[async_trait::async_trait]
impl HighlightFetcher for EchoHighlights {
    async fn resolve(&self, reel_id: &str, _identity: Option<Identity>) -> AppResult<HighlightMetadata> {
        Ok(HighlightMetadata {
            title: format!("Highlight {}", reel_id),
            description: "Top play of the night".to_string(),
            video_url: Some(format!("https://cdn.example/{}.mp4", reel_id)),
        })
    }
}

fn create_test_app() -> Router {
    let sources = FeedSources {
        followed: Arc::new(PagedSource { tag: "f", pages: 3 }),
        model: Arc::new(PagedSource { tag: "m", pages: 3 }),
        highlights: Arc::new(EchoHighlights),
        unresolved_policy: UnresolvedPolicy::Drop,
    };
    create_router(AppState::new(sources))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn create_feed_request(body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/feeds")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty(method: &str, uri: String) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn item_ids(feed: &Value) -> Vec<String> {
    feed["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let (status, body) = send(&app, empty("GET", "/health".to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_anonymous_feed_shows_followed_only() {
    let app = create_test_app();

    let (status, feed) = send(&app, create_feed_request(json!({}), None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(feed["model_loaded"], false);
    assert_eq!(feed["has_more"], true);
    assert_eq!(
        item_ids(&feed),
        vec!["f-1-0", "f-1-1", "f-1-2", "f-1-3", "f-1-4"]
    );
    assert!(feed["items"][0].get("score").is_none());
}

#[tokio::test]
async fn test_token_without_user_id_stays_anonymous() {
    let app = create_test_app();
    let (_, feed) = send(&app, create_feed_request(json!({}), Some("tok"))).await;
    assert_eq!(feed["model_loaded"], false);
}

#[tokio::test]
async fn test_personalized_feed_interleaves_and_loads_more() {
    let app = create_test_app();

    let (status, feed) = send(
        &app,
        create_feed_request(json!({ "user_id": "42" }), Some("token-42")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(feed["model_loaded"], true);
    assert_eq!(feed["items"].as_array().unwrap().len(), 10);
    assert_eq!(feed["items"][5]["source_kind"], "model");
    assert_eq!(feed["items"][5]["score"], 70);

    let session_id = feed["session_id"].as_str().unwrap().to_string();

    let (status, more) = send(&app, empty("POST", format!("/api/v1/feeds/{}/more", session_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(more["outcome"], "fetched");
    assert_eq!(more["source"], "model");

    let (_, more) = send(&app, empty("POST", format!("/api/v1/feeds/{}/more", session_id))).await;
    assert_eq!(more["source"], "followed");
    assert_eq!(more["items"].as_array().unwrap().len(), 20);

    let (status, current) = send(&app, empty("GET", format!("/api/v1/feeds/{}", session_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item_ids(&current), item_ids(&more));
}

#[tokio::test]
async fn test_feed_runs_dry() {
    let app = create_test_app();
    let (_, feed) = send(
        &app,
        create_feed_request(json!({ "user_id": "7" }), Some("token-7")),
    )
    .await;
    let session_id = feed["session_id"].as_str().unwrap().to_string();

    let mut last = feed;
    for _ in 0..4 {
        let (_, more) = send(&app, empty("POST", format!("/api/v1/feeds/{}/more", session_id))).await;
        last = more;
    }
    assert_eq!(last["has_more"], false);
    assert_eq!(last["items"].as_array().unwrap().len(), 30);

    let (_, again) = send(&app, empty("POST", format!("/api/v1/feeds/{}/more", session_id))).await;
    assert_eq!(again["outcome"], "exhausted");
    assert_eq!(item_ids(&again), item_ids(&last));
}

#[tokio::test]
async fn test_closed_feed_is_gone() {
    let app = create_test_app();
    let (_, feed) = send(&app, create_feed_request(json!({}), None)).await;
    let session_id = feed["session_id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, empty("DELETE", format!("/api/v1/feeds/{}", session_id))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, empty("GET", format!("/api/v1/feeds/{}", session_id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains(&session_id));

    let (status, _) = send(&app, empty("DELETE", format!("/api/v1/feeds/{}", session_id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_feed_returns_not_found() {
    let app = create_test_app();
    let uri = format!("/api/v1/feeds/{}/more", uuid::Uuid::new_v4());
    let (status, _) = send(&app, empty("POST", uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_app();
    let id = uuid::Uuid::new_v4().to_string();

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", &id)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], id.as_str());
}

#[tokio::test]
async fn test_search_starts_a_narrowed_feed() {
    let app = create_test_app();

    let (status, feed) = send(&app, create_feed_request(json!({ "search": " homer " }), None)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item_ids(&feed)[0], "f-homer-1-0");
    assert_eq!(item_ids(&feed).len(), 5);
    assert_eq!(feed["has_more"], false);
}
