use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{FeedQuery, FeedSnapshot, Identity, SourceKind},
};

use super::AppState;

// Request/Response types

#[derive(Debug, Default, Deserialize)]
pub struct CreateFeedRequest {
    /// Enables the model recommender together with a bearer token
    #[serde(default)]
    pub user_id: Option<String>,
    /// Narrows both recommenders; a new search means a new feed
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub snapshot: FeedSnapshot,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LoadMoreResponse {
    pub session_id: Uuid,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceKind>,
    #[serde(flatten)]
    pub snapshot: FeedSnapshot,
    pub generated_at: DateTime<Utc>,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn feed_response(session_id: Uuid, snapshot: FeedSnapshot) -> FeedResponse {
    FeedResponse {
        session_id,
        snapshot,
        generated_at: Utc::now(),
    }
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Mounts a feed and runs its initial load
pub async fn create_feed(
    State(state): State<AppState>,
    request_id: Option<axum::Extension<RequestId>>,
    headers: HeaderMap,
    Json(request): Json<CreateFeedRequest>,
) -> AppResult<(StatusCode, Json<FeedResponse>)> {
    let identity = Identity::from_parts(request.user_id, bearer_token(&headers));
    let query = FeedQuery::new(identity, request.search);
    let personalized = query.identity.is_some();
    let searching = query.search.is_some();

    let (session_id, merger) = state.open_session(query).await;
    merger.load_initial().await;
    let snapshot = merger.snapshot().await;

    tracing::info!(
        session_id = %session_id,
        request_id = %request_id.map(|r| r.0.to_string()).unwrap_or_default(),
        personalized,
        searching,
        items = snapshot.items.len(),
        model_loaded = snapshot.model_loaded,
        "Feed mounted"
    );

    Ok((
        StatusCode::CREATED,
        Json(feed_response(session_id, snapshot)),
    ))
}

/// Returns the current rendered sequence without loading anything
pub async fn get_feed(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<FeedResponse>> {
    let merger = state
        .session(&session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Feed {} not found", session_id)))?;

    Ok(Json(feed_response(session_id, merger.snapshot().await)))
}

/// The viewer scrolled near the end of the list
pub async fn load_more(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<LoadMoreResponse>> {
    let merger = state
        .session(&session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Feed {} not found", session_id)))?;

    let outcome = merger.load_more().await;
    let snapshot = merger.snapshot().await;

    tracing::debug!(
        session_id = %session_id,
        outcome = ?outcome,
        items = snapshot.items.len(),
        has_more = snapshot.has_more,
        "Load more handled"
    );

    Ok(Json(LoadMoreResponse {
        session_id,
        outcome: outcome.as_str(),
        source: outcome.source(),
        snapshot,
        generated_at: Utc::now(),
    }))
}

/// Unmounts a feed
pub async fn close_feed(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if !state.close_session(&session_id).await {
        return Err(AppError::NotFound(format!("Feed {} not found", session_id)));
    }

    let open_feeds = state.session_count().await;
    tracing::info!(session_id = %session_id, open_feeds, "Feed closed");
    Ok(StatusCode::NO_CONTENT)
}
