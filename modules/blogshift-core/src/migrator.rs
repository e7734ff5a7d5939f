use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use blogshift_common::{CollectionGroup, Config, MigrationResult, Outcome, Post, ResolvedGroup};

use crate::collections::{CollectionRegistry, CollectionResolver};
use crate::error::MigrateError;
use crate::extract::extract;
use crate::pages::{assemble, upsert_page};
use crate::retry::ReadRetryPolicy;
use crate::store::ContentStore;

const DEFAULT_PAGE_TYPE: &str = "blog_page";

/// Counts of per-post outcomes for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    pub created: usize,
    pub existing: usize,
    pub failed: usize,
}

impl MigrationSummary {
    pub fn from_results(results: &[MigrationResult]) -> Self {
        results
            .iter()
            .fold(Self::default(), |mut summary, result| {
                match result.outcome {
                    Outcome::Created => summary.created += 1,
                    Outcome::Existing => summary.existing += 1,
                    Outcome::Error => summary.failed += 1,
                }
                summary
            })
    }
}

/// Migrates blog posts into pages: extract, resolve collections, assemble,
/// upsert. Holds the store handle injected at startup and the collection
/// registry every run shares.
pub struct Migrator {
    store: Arc<dyn ContentStore>,
    registry: Arc<CollectionRegistry>,
    policy: ReadRetryPolicy,
    page_type: String,
    max_concurrency: Option<usize>,
}

impl Migrator {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            registry: Arc::new(CollectionRegistry::new()),
            policy: ReadRetryPolicy::default(),
            page_type: DEFAULT_PAGE_TYPE.to_string(),
            max_concurrency: None,
        }
    }

    pub fn from_config(store: Arc<dyn ContentStore>, config: &Config) -> Self {
        Self::new(store)
            .with_read_retry(ReadRetryPolicy::from_config(config))
            .with_page_type(&config.page_type)
            .with_max_concurrency(config.max_concurrency)
    }

    pub fn with_read_retry(mut self, policy: ReadRetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_page_type(mut self, page_type: &str) -> Self {
        self.page_type = page_type.to_string();
        self
    }

    /// Cap on posts migrated at once. `None` runs the whole batch at once.
    pub fn with_max_concurrency(mut self, limit: Option<usize>) -> Self {
        self.max_concurrency = limit.filter(|n| *n > 0);
        self
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    /// Migrate a single post. Never fails: errors become an `Error` result.
    pub async fn migrate_post(&self, post: &Post) -> MigrationResult {
        let resolver = self.resolver();
        self.migrate_with(&resolver, post).await
    }

    /// Migrate every post concurrently. Results line up with `posts`; one
    /// post failing does not affect the others. Collection items shared
    /// between posts, or with any other run on this migrator, are resolved
    /// once.
    pub async fn migrate_all(&self, posts: &[Post]) -> Vec<MigrationResult> {
        let resolver = self.resolver();
        let limit = self.max_concurrency.unwrap_or(posts.len()).max(1);

        info!(posts = posts.len(), limit, "Starting blog page migration");
        let pending: Vec<_> = posts
            .iter()
            .map(|post| self.migrate_with(&resolver, post))
            .collect();
        let results: Vec<MigrationResult> = stream::iter(pending).buffered(limit).collect().await;

        let summary = MigrationSummary::from_results(&results);
        info!(
            created = summary.created,
            existing = summary.existing,
            failed = summary.failed,
            "Blog page migration finished"
        );
        results
    }

    /// List every source post, then migrate them all. Only a failed listing
    /// fails the call.
    pub async fn migrate_from_source(&self) -> Result<Vec<MigrationResult>, MigrateError> {
        let posts = self.store.list_posts().await?;
        info!(
            slugs = ?posts.iter().map(|p| p.slug.as_str()).collect::<Vec<_>>(),
            "Fetched blog posts from source"
        );
        Ok(self.migrate_all(&posts).await)
    }

    /// Create-or-find arbitrary collection groups without building pages.
    pub async fn resolve_collections(
        &self,
        groups: &[CollectionGroup],
    ) -> Result<Vec<ResolvedGroup>, MigrateError> {
        self.resolver().resolve_all(groups).await
    }

    fn resolver(&self) -> CollectionResolver<'_> {
        CollectionResolver::with_registry(self.store.as_ref(), self.policy, self.registry.clone())
    }

    async fn migrate_with(&self, resolver: &CollectionResolver<'_>, post: &Post) -> MigrationResult {
        match self.try_migrate(resolver, post).await {
            Ok(result) => {
                info!(slug = post.slug.as_str(), outcome = %result.outcome, "Post migrated");
                result
            }
            Err(err) => {
                warn!(slug = post.slug.as_str(), error = %err, "Post migration failed");
                MigrationResult::failed(&post.slug, err)
            }
        }
    }

    async fn try_migrate(
        &self,
        resolver: &CollectionResolver<'_>,
        post: &Post,
    ) -> Result<MigrationResult, MigrateError> {
        if post.slug.trim().is_empty() {
            return Err(MigrateError::MissingSlug);
        }
        let groups = extract(post);
        let resolved = resolver.resolve_all(&groups).await?;
        let page = assemble(post, &resolved, &self.page_type);
        Ok(upsert_page(self.store.as_ref(), &self.policy, &page).await?)
    }
}
