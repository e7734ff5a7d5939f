use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use blogshift_common::{CollectionDefinition, CollectionGroup, Post};

use crate::AppState;

/// `POST /api/collections` accepts either a bare list or `{"collections": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum CollectionsBody {
    Bare(Vec<CollectionDefinition>),
    Wrapped { collections: Vec<CollectionDefinition> },
}

impl CollectionsBody {
    fn into_groups(self) -> Vec<CollectionGroup> {
        let defs = match self {
            CollectionsBody::Bare(defs) => defs,
            CollectionsBody::Wrapped { collections } => collections,
        };
        defs.into_iter().map(CollectionGroup::from).collect()
    }
}

fn error_response(err: impl std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": err.to_string() })),
    )
        .into_response()
}

// --- Handlers ---

pub async fn api_posts(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.migrator.store().list_posts().await {
        Ok(posts) => Json(posts).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to list blog posts");
            error_response(e)
        }
    }
}

pub async fn api_pages(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.migrator.store().list_pages().await {
        Ok(pages) => Json(pages).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to list pages");
            error_response(e)
        }
    }
}

pub async fn api_create_collections(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CollectionsBody>,
) -> impl IntoResponse {
    let groups = body.into_groups();
    match state.migrator.resolve_collections(&groups).await {
        Ok(resolved) => Json(resolved).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to create collections");
            error_response(e)
        }
    }
}

/// Migrate the posts in the request body.
pub async fn api_generate_pages(
    State(state): State<Arc<AppState>>,
    Json(posts): Json<Vec<Post>>,
) -> impl IntoResponse {
    let results = state.migrator.migrate_all(&posts).await;
    let committed = results.iter().filter(|r| r.data.is_some()).count();
    info!(posts = posts.len(), committed, "Generated blog pages");
    Json(results).into_response()
}

/// Migrate every post in the source blog.
pub async fn api_migrate(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.migrator.migrate_from_source().await {
        Ok(results) => Json(results).into_response(),
        Err(e) => {
            warn!(error = %e, "Blog migration failed");
            error_response(e)
        }
    }
}
