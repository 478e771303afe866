use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(request_id_middleware))
}

/// Feed session routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/feeds", post(handlers::create_feed))
        .route(
            "/feeds/:session_id",
            get(handlers::get_feed).delete(handlers::close_feed),
        )
        .route("/feeds/:session_id/more", post(handlers::load_more))
}
