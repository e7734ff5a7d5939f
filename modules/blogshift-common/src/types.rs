use std::fmt;

use serde::{Deserialize, Serialize};

// --- Source records ---

/// A blog post as listed by the source blog engine. Every nested field is
/// optional: posts with missing data still migrate with the gaps left unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub published: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub seo_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub featured_image_alt: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub categories: Option<Vec<Term>>,
    #[serde(default)]
    pub tags: Option<Vec<Term>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Author {
    /// "First Last", skipping whichever half is missing.
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// A category or tag reference on a post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Term {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

// --- Taxonomy ---

/// The three collections a blog page depends on. Serialized as the
/// collection key used by the content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaxonomyType {
    #[serde(rename = "blog_author")]
    Author,
    #[serde(rename = "blog_category")]
    Category,
    #[serde(rename = "blog_tag")]
    Tag,
}

impl TaxonomyType {
    pub fn collection_key(&self) -> &'static str {
        match self {
            TaxonomyType::Author => "blog_author",
            TaxonomyType::Category => "blog_category",
            TaxonomyType::Tag => "blog_tag",
        }
    }
}

impl fmt::Display for TaxonomyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection_key())
    }
}

/// Fields written for a collection item. `slug` is the natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEntity {
    pub taxonomy: TaxonomyType,
    pub fields: CollectionItem,
}

impl TaxonomyEntity {
    pub fn new(taxonomy: TaxonomyType, fields: CollectionItem) -> Self {
        Self { taxonomy, fields }
    }

    pub fn natural_key(&self) -> &str {
        &self.fields.slug
    }
}

/// Store-assigned identifier. ButterCMS uses integers, but nothing here
/// depends on that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{n}"),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMeta {
    #[serde(default)]
    pub id: Option<EntityId>,
}

/// A collection item as read back from the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredEntity {
    #[serde(default)]
    pub meta: EntityMeta,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl StoredEntity {
    pub fn id(&self) -> Option<&EntityId> {
        self.meta.id.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStatus {
    Created,
    Existing,
}

/// A taxonomy entity after create-or-find. `id` is `None` when the store
/// accepted the create but the re-read did not see it yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    #[serde(flatten)]
    pub entity: TaxonomyEntity,
    pub id: Option<EntityId>,
    pub status: ResolutionStatus,
}

/// A post's dependent entities of one taxonomy type, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionGroup {
    pub taxonomy: TaxonomyType,
    pub items: Vec<TaxonomyEntity>,
}

/// Result of resolving one group. `items` is `None` when the group was empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedGroup {
    pub taxonomy: TaxonomyType,
    pub items: Option<Vec<ResolvedEntity>>,
}

impl ResolvedGroup {
    /// Identifiers of the resolved items, in order. Items without an id are skipped.
    pub fn ids(&self) -> Vec<EntityId> {
        self.items
            .iter()
            .flatten()
            .filter_map(|item| item.id.clone())
            .collect()
    }
}

/// Request shape for creating collections directly: `{key, data: [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionDefinition {
    pub key: TaxonomyType,
    #[serde(default)]
    pub data: Option<Vec<CollectionItem>>,
}

/// Items with a blank slug have no natural key and are dropped.
impl From<CollectionDefinition> for CollectionGroup {
    fn from(def: CollectionDefinition) -> Self {
        let taxonomy = def.key;
        CollectionGroup {
            taxonomy,
            items: def
                .data
                .unwrap_or_default()
                .into_iter()
                .filter_map(|mut fields| {
                    let slug = fields.slug.trim();
                    if slug.is_empty() {
                        tracing::warn!(%taxonomy, "Collection item has no slug, skipping");
                        return None;
                    }
                    fields.slug = slug.to_string();
                    Some(TaxonomyEntity::new(taxonomy, fields))
                })
                .collect(),
        }
    }
}

// --- Pages ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlogSeo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub og_image: Option<String>,
    pub og_image_alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyBlock {
    pub content_block: ContentBlock,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageFields {
    pub blog_seo: BlogSeo,
    pub title: Option<String>,
    pub body: Vec<BodyBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<EntityId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<EntityId>>,
    pub summary: Option<String>,
    pub publish_date: Option<String>,
}

/// The page write payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPage {
    #[serde(rename = "page-type")]
    pub page_type: String,
    pub status: String,
    pub title: Option<String>,
    pub slug: String,
    pub fields: PageFields,
}

/// A page as read back from the store. Reference fields come back expanded,
/// so `fields` stays untyped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredPage {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub page_type: Option<String>,
    #[serde(default)]
    pub published: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub fields: serde_json::Value,
}

// --- Results ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Created,
    Existing,
    Error,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Created => "created",
            Outcome::Existing => "existing",
            Outcome::Error => "error",
        };
        f.write_str(s)
    }
}

/// Per-post migration result. A `Created` result with `data: None` means
/// the write was accepted but was not yet visible on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationResult {
    pub outcome: Outcome,
    pub slug: String,
    pub data: Option<StoredPage>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MigrationResult {
    pub fn created(slug: &str, data: Option<StoredPage>) -> Self {
        Self {
            outcome: Outcome::Created,
            slug: slug.to_string(),
            data,
            error: None,
            message: Some(format!("Blog page created: {slug}")),
        }
    }

    pub fn existing(slug: &str, data: StoredPage) -> Self {
        Self {
            outcome: Outcome::Existing,
            slug: slug.to_string(),
            data: Some(data),
            error: None,
            message: Some(format!("Blog page already exists: {slug}")),
        }
    }

    pub fn failed(slug: &str, error: impl ToString) -> Self {
        Self {
            outcome: Outcome::Error,
            slug: slug.to_string(),
            data: None,
            error: Some(error.to_string()),
            message: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.outcome == Outcome::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_with_only_slug_deserializes() {
        let post: Post = serde_json::from_value(serde_json::json!({"slug": "bare"})).unwrap();
        assert_eq!(post.slug, "bare");
        assert!(post.author.is_none());
        assert!(post.categories.is_none());
    }

    #[test]
    fn author_display_name_skips_missing_half() {
        let author = Author {
            first_name: Some("Ada".into()),
            last_name: None,
            ..Default::default()
        };
        assert_eq!(author.display_name().as_deref(), Some("Ada"));
        assert_eq!(Author::default().display_name(), None);
    }

    #[test]
    fn taxonomy_type_uses_collection_keys_on_the_wire() {
        let json = serde_json::to_value(TaxonomyType::Category).unwrap();
        assert_eq!(json, "blog_category");
        let parsed: TaxonomyType = serde_json::from_value(serde_json::json!("blog_tag")).unwrap();
        assert_eq!(parsed, TaxonomyType::Tag);
    }

    #[test]
    fn stored_entity_reads_meta_id() {
        let entity: StoredEntity = serde_json::from_value(serde_json::json!({
            "name": "News",
            "slug": "news",
            "meta": {"id": 42}
        }))
        .unwrap();
        assert_eq!(entity.id(), Some(&EntityId::Number(42)));
        assert_eq!(entity.fields["slug"], "news");
    }

    #[test]
    fn page_payload_omits_unset_reference_fields() {
        let page = NewPage {
            page_type: "blog_page".into(),
            status: "published".into(),
            title: Some("T".into()),
            slug: "t".into(),
            fields: PageFields {
                categories: Some(vec![EntityId::Number(7)]),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["page-type"], "blog_page");
        assert_eq!(json["fields"]["categories"], serde_json::json!([7]));
        assert!(json["fields"].get("author").is_none());
        assert!(json["fields"].get("tags").is_none());
    }

    #[test]
    fn collection_definition_with_null_data_is_an_empty_group() {
        let def: CollectionDefinition =
            serde_json::from_value(serde_json::json!({"key": "blog_tag", "data": null})).unwrap();
        let group = CollectionGroup::from(def);
        assert_eq!(group.taxonomy, TaxonomyType::Tag);
        assert!(group.items.is_empty());
    }
}
