// In-memory ContentStore for tests.
//
// MockContentStore keeps posts, collection items and pages in maps, records
// every call in order (with the paused-clock instant it happened at), and
// can be told to fail or lag specific writes.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use blogshift_common::{
    CollectionItem, EntityId, EntityMeta, NewPage, Post, StoreError, StoredEntity, StoredPage,
    TaxonomyType,
};

use crate::store::{ContentStore, WriteReceipt};

/// One call into the mock, in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreCall {
    ListPosts,
    ListPages,
    GetEntity(TaxonomyType, String),
    CreateEntity(TaxonomyType, String),
    GetPage(String),
    CreatePage(String),
}

type EntityKey = (TaxonomyType, String);

struct MockContentStoreInner {
    posts: Vec<Post>,
    entities: HashMap<EntityKey, StoredEntity>,
    pages: HashMap<String, StoredPage>,
    created_pages: Vec<NewPage>,
    next_id: i64,
    calls: Vec<(StoreCall, Instant)>,
    fail_list_posts: bool,
    failing_entity_creates: HashSet<EntityKey>,
    rejected_entity_creates: HashSet<EntityKey>,
    failing_page_creates: HashSet<String>,
    rejected_page_creates: HashMap<String, serde_json::Value>,
    /// slug → remaining `get_page` misses after a create
    page_lag: HashMap<String, u32>,
    /// key → remaining `get_entity` misses after a create
    entity_lag: HashMap<EntityKey, u32>,
    /// keys whose created items never expose an id
    idless_entities: HashSet<EntityKey>,
}

/// Stateful in-memory content store. Thread-safe via interior Mutex.
pub struct MockContentStore {
    inner: Mutex<MockContentStoreInner>,
    latency: Duration,
}

impl Default for MockContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockContentStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MockContentStoreInner {
                posts: Vec::new(),
                entities: HashMap::new(),
                pages: HashMap::new(),
                created_pages: Vec::new(),
                next_id: 1,
                calls: Vec::new(),
                fail_list_posts: false,
                failing_entity_creates: HashSet::new(),
                rejected_entity_creates: HashSet::new(),
                failing_page_creates: HashSet::new(),
                rejected_page_creates: HashMap::new(),
                page_lag: HashMap::new(),
                entity_lag: HashMap::new(),
                idless_entities: HashSet::new(),
            }),
            latency: Duration::ZERO,
        }
    }

    /// Source posts returned by `list_posts`.
    pub fn with_posts(self, posts: Vec<Post>) -> Self {
        self.inner.lock().unwrap().posts = posts;
        self
    }

    /// Pre-populate a collection item with a fixed id.
    pub fn with_entity(self, taxonomy: TaxonomyType, slug: &str, id: i64) -> Self {
        self.inner.lock().unwrap().entities.insert(
            (taxonomy, slug.to_string()),
            stored_entity(slug, Some(EntityId::Number(id))),
        );
        self
    }

    /// Pre-populate a page.
    pub fn with_page(self, slug: &str) -> Self {
        self.inner.lock().unwrap().pages.insert(
            slug.to_string(),
            StoredPage {
                slug: slug.to_string(),
                fields: serde_json::json!({ "seeded": true }),
                ..Default::default()
            },
        );
        self
    }

    /// Sleep this long inside every call, so concurrent callers interleave.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make `list_posts` fail.
    pub fn failing_list_posts(self) -> Self {
        self.inner.lock().unwrap().fail_list_posts = true;
        self
    }

    /// Make `create_entity` fail with a 500 for this key.
    pub fn failing_entity_create(self, taxonomy: TaxonomyType, slug: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .failing_entity_creates
            .insert((taxonomy, slug.to_string()));
        self
    }

    /// Make `create_entity` answer 400 for this key without storing anything.
    pub fn rejecting_entity_create(self, taxonomy: TaxonomyType, slug: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .rejected_entity_creates
            .insert((taxonomy, slug.to_string()));
        self
    }

    /// Make `create_page` fail with a transport error for this slug.
    pub fn failing_page_create(self, slug: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .failing_page_creates
            .insert(slug.to_string());
        self
    }

    /// Make `create_page` answer with a non-pending body for this slug.
    pub fn rejecting_page_create(self, slug: &str, body: serde_json::Value) -> Self {
        self.inner
            .lock()
            .unwrap()
            .rejected_page_creates
            .insert(slug.to_string(), body);
        self
    }

    /// After creating this page, `get_page` misses `reads` times before it sees it.
    pub fn page_visibility_lag(self, slug: &str, reads: u32) -> Self {
        self.inner
            .lock()
            .unwrap()
            .page_lag
            .insert(slug.to_string(), reads);
        self
    }

    /// After creating this item, `get_entity` misses `reads` times before it sees it.
    pub fn entity_visibility_lag(self, taxonomy: TaxonomyType, slug: &str, reads: u32) -> Self {
        self.inner
            .lock()
            .unwrap()
            .entity_lag
            .insert((taxonomy, slug.to_string()), reads);
        self
    }

    /// Created items for this key are visible but never carry an id.
    pub fn idless_entity(self, taxonomy: TaxonomyType, slug: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .idless_entities
            .insert((taxonomy, slug.to_string()));
        self
    }

    // --- Assertion helpers ---

    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(call, _)| call.clone())
            .collect()
    }

    /// Calls with the instant each was made.
    pub fn timed_calls(&self) -> Vec<(StoreCall, Instant)> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &StoreCall) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(c, _)| c == call)
            .count()
    }

    pub fn entity_creates(&self, taxonomy: TaxonomyType) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter_map(|(c, _)| match c {
                StoreCall::CreateEntity(t, slug) if *t == taxonomy => Some(slug.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn created_pages(&self) -> Vec<NewPage> {
        self.inner.lock().unwrap().created_pages.clone()
    }

    pub fn entity_id(&self, taxonomy: TaxonomyType, slug: &str) -> Option<EntityId> {
        self.inner
            .lock()
            .unwrap()
            .entities
            .get(&(taxonomy, slug.to_string()))
            .and_then(|e| e.meta.id.clone())
    }

    pub fn has_page(&self, slug: &str) -> bool {
        self.inner.lock().unwrap().pages.contains_key(slug)
    }

    async fn record(&self, call: StoreCall) {
        self.inner
            .lock()
            .unwrap()
            .calls
            .push((call, Instant::now()));
        if self.latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.latency).await;
        }
    }
}

fn stored_entity(slug: &str, id: Option<EntityId>) -> StoredEntity {
    let mut fields = serde_json::Map::new();
    fields.insert("slug".into(), serde_json::Value::String(slug.to_string()));
    StoredEntity {
        meta: EntityMeta { id },
        fields,
    }
}

#[async_trait]
impl ContentStore for MockContentStore {
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        self.record(StoreCall::ListPosts).await;
        let inner = self.inner.lock().unwrap();
        if inner.fail_list_posts {
            return Err(StoreError::Api {
                status: 503,
                message: "MockContentStore: list_posts unavailable".into(),
            });
        }
        Ok(inner.posts.clone())
    }

    async fn list_pages(&self) -> Result<Vec<StoredPage>, StoreError> {
        self.record(StoreCall::ListPages).await;
        let inner = self.inner.lock().unwrap();
        let mut pages: Vec<StoredPage> = inner.pages.values().cloned().collect();
        pages.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(pages)
    }

    async fn get_entity(
        &self,
        taxonomy: TaxonomyType,
        natural_key: &str,
    ) -> Result<Option<StoredEntity>, StoreError> {
        self.record(StoreCall::GetEntity(taxonomy, natural_key.to_string()))
            .await;
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        let key = (taxonomy, natural_key.to_string());
        if let Some(remaining) = inner.entity_lag.get_mut(&key) {
            if *remaining > 0 && inner.entities.contains_key(&key) {
                *remaining -= 1;
                return Ok(None);
            }
        }
        Ok(inner.entities.get(&key).cloned())
    }

    async fn create_entity(
        &self,
        taxonomy: TaxonomyType,
        fields: &CollectionItem,
    ) -> Result<WriteReceipt, StoreError> {
        self.record(StoreCall::CreateEntity(taxonomy, fields.slug.clone()))
            .await;
        let mut inner = self.inner.lock().unwrap();
        let key = (taxonomy, fields.slug.clone());
        if inner.failing_entity_creates.contains(&key) {
            return Err(StoreError::Api {
                status: 500,
                message: format!("MockContentStore: create failed for {taxonomy} {}", fields.slug),
            });
        }
        if inner.rejected_entity_creates.contains(&key) {
            return Err(StoreError::Api {
                status: 400,
                message: format!("MockContentStore: invalid {taxonomy} {}", fields.slug),
            });
        }
        if inner.entities.contains_key(&key) {
            return Err(StoreError::Api {
                status: 400,
                message: format!("MockContentStore: duplicate {taxonomy} {}", fields.slug),
            });
        }
        let id = if inner.idless_entities.contains(&key) {
            None
        } else {
            let id = inner.next_id;
            inner.next_id += 1;
            Some(EntityId::Number(id))
        };
        let mut entity = stored_entity(&fields.slug, id);
        if let Some(name) = &fields.name {
            entity
                .fields
                .insert("name".into(), serde_json::Value::String(name.clone()));
        }
        inner.entities.insert(key, entity);
        Ok(WriteReceipt::pending())
    }

    async fn get_page(&self, slug: &str) -> Result<Option<StoredPage>, StoreError> {
        self.record(StoreCall::GetPage(slug.to_string())).await;
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        if let Some(remaining) = inner.page_lag.get_mut(slug) {
            if *remaining > 0 && inner.pages.contains_key(slug) {
                *remaining -= 1;
                return Ok(None);
            }
        }
        Ok(inner.pages.get(slug).cloned())
    }

    async fn create_page(&self, page: &NewPage) -> Result<WriteReceipt, StoreError> {
        self.record(StoreCall::CreatePage(page.slug.clone())).await;
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_page_creates.contains(&page.slug) {
            return Err(StoreError::Network(format!(
                "MockContentStore: connection reset creating {}",
                page.slug
            )));
        }
        if let Some(body) = inner.rejected_page_creates.get(&page.slug) {
            return Ok(WriteReceipt {
                status: None,
                body: body.clone(),
            });
        }
        inner.created_pages.push(page.clone());
        let fields = serde_json::to_value(&page.fields)
            .map_err(|e| StoreError::Parse(e.to_string()))?;
        inner.pages.insert(
            page.slug.clone(),
            StoredPage {
                slug: page.slug.clone(),
                name: page.title.clone(),
                page_type: Some(page.page_type.clone()),
                published: page.fields.publish_date.clone(),
                updated: None,
                fields,
            },
        );
        Ok(WriteReceipt::pending())
    }
}
