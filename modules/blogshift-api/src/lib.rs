use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use blogshift_core::Migrator;

pub mod rest;

pub struct AppState {
    pub migrator: Migrator,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Source and target listings
        .route("/api/posts", get(rest::api_posts))
        .route("/api/pages", get(rest::api_pages).post(rest::api_generate_pages))
        // Migration
        .route("/api/collections", post(rest::api_create_collections))
        .route("/api/migrate", post(rest::api_migrate))
        .with_state(state)
        // Logging layer: method + path only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
