use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use blogshift_common::{
    CollectionGroup, EntityId, ResolutionStatus, ResolvedEntity, ResolvedGroup, StoreError,
    TaxonomyEntity, TaxonomyType,
};

use crate::error::MigrateError;
use crate::retry::ReadRetryPolicy;
use crate::store::ContentStore;

/// Find-or-create one collection item by natural key.
///
/// Does not retry the post-create read: a create that is not yet visible
/// comes back as `Created` with `id: None`. A create rejected with a 4xx is
/// treated as a lost race if the item is visible afterwards.
pub async fn upsert_entity(
    store: &dyn ContentStore,
    entity: &TaxonomyEntity,
) -> Result<ResolvedEntity, StoreError> {
    let taxonomy = entity.taxonomy;
    let slug = entity.natural_key();

    if let Some(existing) = store.get_entity(taxonomy, slug).await? {
        info!(%taxonomy, slug, "Collection item already exists");
        return Ok(resolved(entity, existing.id().cloned(), ResolutionStatus::Existing));
    }

    match store.create_entity(taxonomy, &entity.fields).await {
        Ok(receipt) => {
            info!(%taxonomy, slug, status = ?receipt.status, "Collection item created");
        }
        Err(err) if is_client_rejection(&err) => {
            return match store.get_entity(taxonomy, slug).await? {
                Some(existing) => {
                    warn!(%taxonomy, slug, error = %err, "Create rejected but item now exists, reusing it");
                    Ok(resolved(entity, existing.id().cloned(), ResolutionStatus::Existing))
                }
                None => Err(err),
            };
        }
        Err(err) => return Err(err),
    }

    let created = store.get_entity(taxonomy, slug).await?;
    Ok(resolved(
        entity,
        created.and_then(|c| c.meta.id),
        ResolutionStatus::Created,
    ))
}

fn resolved(
    entity: &TaxonomyEntity,
    id: Option<EntityId>,
    status: ResolutionStatus,
) -> ResolvedEntity {
    ResolvedEntity {
        entity: entity.clone(),
        id,
        status,
    }
}

fn is_client_rejection(err: &StoreError) -> bool {
    matches!(err, StoreError::Api { status, .. } if (400..500).contains(status))
}

type RegistryKey = (TaxonomyType, String);

/// Map of natural key to in-flight or finished resolution.
///
/// Concurrent requests for the same key share one create-or-find, so two
/// posts with the same tag never race two creates. A `Migrator` keeps one
/// registry for its whole lifetime, so overlapping runs join the same
/// create too. The first caller gets the upserter's status; everyone after
/// it sees `Existing`. Failures are not remembered.
#[derive(Default)]
pub struct CollectionRegistry {
    slots: Mutex<HashMap<RegistryKey, Arc<OnceCell<ResolvedEntity>>>>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, entity: &TaxonomyEntity) -> Arc<OnceCell<ResolvedEntity>> {
        let key = (entity.taxonomy, entity.natural_key().to_string());
        self.slots.lock().await.entry(key).or_default().clone()
    }

    /// Resolve `entity`, joining any in-flight resolution for the same key.
    pub async fn resolve(
        &self,
        store: &dyn ContentStore,
        policy: &ReadRetryPolicy,
        entity: &TaxonomyEntity,
    ) -> Result<ResolvedEntity, MigrateError> {
        let slot = self.slot(entity).await;
        let ran = AtomicBool::new(false);
        let ran_here = &ran;

        let cached = slot
            .get_or_try_init(move || async move {
                ran_here.store(true, Ordering::SeqCst);
                resolve_uncached(store, policy, entity).await
            })
            .await?;

        if ran.load(Ordering::SeqCst) {
            Ok(cached.clone())
        } else {
            debug!(taxonomy = %entity.taxonomy, slug = entity.natural_key(), "Reusing resolution from this run");
            Ok(ResolvedEntity {
                status: ResolutionStatus::Existing,
                ..cached.clone()
            })
        }
    }

    /// Number of distinct keys seen this run.
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Upsert, then re-read under `policy` if the store has not exposed an id yet.
async fn resolve_uncached(
    store: &dyn ContentStore,
    policy: &ReadRetryPolicy,
    entity: &TaxonomyEntity,
) -> Result<ResolvedEntity, MigrateError> {
    let mut resolved = upsert_entity(store, entity).await?;

    if resolved.id.is_none() {
        let taxonomy = entity.taxonomy;
        let slug = entity.natural_key();
        debug!(%taxonomy, slug, "Identifier not visible yet, re-reading");
        resolved.id = policy
            .read_until_visible(move || async move {
                store
                    .get_entity(taxonomy, slug)
                    .await
                    .map(|found| found.and_then(|f| f.meta.id))
            })
            .await?;
    }

    match resolved.id {
        Some(_) => Ok(resolved),
        None => Err(MigrateError::Unresolved {
            taxonomy: entity.taxonomy,
            slug: entity.natural_key().to_string(),
        }),
    }
}

/// Resolves a post's collection groups against the store, sharing one
/// registry across every call made through it.
pub struct CollectionResolver<'a> {
    store: &'a dyn ContentStore,
    policy: ReadRetryPolicy,
    registry: Arc<CollectionRegistry>,
}

impl<'a> CollectionResolver<'a> {
    /// Resolver with a registry of its own.
    pub fn new(store: &'a dyn ContentStore, policy: ReadRetryPolicy) -> Self {
        Self::with_registry(store, policy, Arc::new(CollectionRegistry::new()))
    }

    /// Resolver that joins resolutions already in `registry`.
    pub fn with_registry(
        store: &'a dyn ContentStore,
        policy: ReadRetryPolicy,
        registry: Arc<CollectionRegistry>,
    ) -> Self {
        Self {
            store,
            policy,
            registry,
        }
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    /// Resolve every group concurrently. Empty groups come back with
    /// `items: None`. Any failed item fails the whole call, but only after
    /// every dispatched upsert has finished.
    pub async fn resolve_all(
        &self,
        groups: &[CollectionGroup],
    ) -> Result<Vec<ResolvedGroup>, MigrateError> {
        join_all(groups.iter().map(|group| self.resolve_group(group)))
            .await
            .into_iter()
            .collect()
    }

    async fn resolve_group(&self, group: &CollectionGroup) -> Result<ResolvedGroup, MigrateError> {
        if group.items.is_empty() {
            return Ok(ResolvedGroup {
                taxonomy: group.taxonomy,
                items: None,
            });
        }

        let items = join_all(
            group
                .items
                .iter()
                .map(|entity| self.registry.resolve(self.store, &self.policy, entity)),
        )
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

        Ok(ResolvedGroup {
            taxonomy: group.taxonomy,
            items: Some(items),
        })
    }
}
