//! Router tests against the in-memory content store.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use blogshift_api::{build_router, AppState};
use blogshift_common::{Post, TaxonomyType};
use blogshift_core::testing::MockContentStore;
use blogshift_core::{ContentStore, Migrator};

fn app(store: Arc<MockContentStore>) -> axum::Router {
    let state = Arc::new(AppState {
        migrator: Migrator::new(store as Arc<dyn ContentStore>),
    });
    build_router(state)
}

async fn send(app: axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_check_is_ok() {
    let resp = app(Arc::new(MockContentStore::new()))
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn generate_pages_returns_per_post_results() {
    let store = Arc::new(MockContentStore::new().failing_page_create("broken"));
    let body = json!([
        {
            "slug": "post-a",
            "title": "Post A",
            "author": {"first_name": "A", "last_name": "B", "slug": "a-b"},
            "categories": [{"name": "News", "slug": "news"}],
            "tags": []
        },
        {"slug": "broken", "title": "Broken"}
    ]);

    let (status, value) = send(app(store.clone()), "POST", "/api/pages", Some(body)).await;

    assert_eq!(status, StatusCode::OK);
    let results = value.as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["outcome"], "created");
    assert_eq!(results[0]["slug"], "post-a");
    assert_eq!(results[0]["data"]["slug"], "post-a");
    assert_eq!(results[1]["outcome"], "error");
    assert!(results[1]["error"].as_str().unwrap().contains("broken"));
    assert!(store.entity_id(TaxonomyType::Category, "news").is_some());
}

#[tokio::test]
async fn migrate_reports_listing_failure_as_500() {
    let store = Arc::new(MockContentStore::new().failing_list_posts());

    let (status, value) = send(app(store), "POST", "/api/migrate", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(value["error"].as_str().unwrap().contains("unavailable"));
}

#[tokio::test]
async fn migrate_runs_every_source_post() {
    let posts: Vec<Post> = vec![
        serde_json::from_value(json!({"slug": "one", "tags": [{"name": "t", "slug": "t"}]})).unwrap(),
        serde_json::from_value(json!({"slug": "two", "tags": [{"name": "t", "slug": "t"}]})).unwrap(),
    ];
    let store = Arc::new(MockContentStore::new().with_posts(posts));

    let (status, value) = send(app(store.clone()), "POST", "/api/migrate", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value.as_array().unwrap().len(), 2);
    assert_eq!(store.entity_creates(TaxonomyType::Tag), vec!["t"]);
}

#[tokio::test]
async fn collections_accepts_bare_and_wrapped_bodies() {
    let store = Arc::new(MockContentStore::new().with_entity(TaxonomyType::Tag, "old", 5));
    let defs = json!([
        {"key": "blog_tag", "data": [{"name": "Old", "slug": "old"}, {"name": "New", "slug": "new"}]},
        {"key": "blog_category", "data": null}
    ]);

    let (status, value) = send(app(store.clone()), "POST", "/api/collections", Some(defs.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let groups = value.as_array().unwrap();
    assert_eq!(groups[0]["taxonomy"], "blog_tag");
    assert_eq!(groups[0]["items"][0]["status"], "existing");
    assert_eq!(groups[0]["items"][0]["id"], 5);
    assert_eq!(groups[0]["items"][1]["status"], "created");
    assert!(groups[1]["items"].is_null());

    let (status, value) = send(
        app(store),
        "POST",
        "/api/collections",
        Some(json!({ "collections": defs })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value[0]["items"][1]["status"], "existing");
}

#[tokio::test]
async fn collections_skip_items_without_a_slug() {
    let store = Arc::new(MockContentStore::new());
    let defs = json!([
        {"key": "blog_tag", "data": [{"name": "Blank", "slug": ""}, {"slug": "   "}, {"name": "Kept", "slug": " kept "}]},
        {"key": "blog_category", "data": [{"name": "Nothing", "slug": ""}]}
    ]);

    let (status, value) = send(app(store.clone()), "POST", "/api/collections", Some(defs)).await;

    assert_eq!(status, StatusCode::OK);
    let tags = value[0]["items"].as_array().unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0]["fields"]["slug"], "kept");
    assert!(value[1]["items"].is_null());
    assert_eq!(store.entity_creates(TaxonomyType::Tag), vec!["kept"]);
    assert!(store.entity_creates(TaxonomyType::Category).is_empty());
}

#[tokio::test]
async fn listings_pass_through_the_store() {
    let store = Arc::new(
        MockContentStore::new()
            .with_page("p1")
            .with_posts(vec![serde_json::from_value(json!({"slug": "s1"})).unwrap()]),
    );

    let (status, pages) = send(app(store.clone()), "GET", "/api/pages", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pages[0]["slug"], "p1");

    let (status, posts) = send(app(store), "GET", "/api/posts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(posts[0]["slug"], "s1");
}
