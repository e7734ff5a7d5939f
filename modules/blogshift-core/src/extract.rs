use tracing::warn;

use blogshift_common::{
    CollectionGroup, CollectionItem, Post, TaxonomyEntity, TaxonomyType, Term,
};

/// Derive the author, category and tag groups a post depends on.
///
/// Always returns one group per taxonomy type: author, category, tag.
/// A missing author or list yields an empty group. Entries without a slug
/// have no natural key and are skipped.
pub fn extract(post: &Post) -> Vec<CollectionGroup> {
    let author = post
        .author
        .as_ref()
        .and_then(|author| match author.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => Some(CollectionItem {
                name: author.display_name(),
                slug: slug.to_string(),
                description: author.bio.clone(),
            }),
            _ => {
                warn!(post = post.slug.as_str(), "Author has no slug, skipping");
                None
            }
        })
        .map(|fields| TaxonomyEntity::new(TaxonomyType::Author, fields));

    vec![
        CollectionGroup {
            taxonomy: TaxonomyType::Author,
            items: author.into_iter().collect(),
        },
        CollectionGroup {
            taxonomy: TaxonomyType::Category,
            items: terms(post, TaxonomyType::Category, post.categories.as_deref()),
        },
        CollectionGroup {
            taxonomy: TaxonomyType::Tag,
            items: terms(post, TaxonomyType::Tag, post.tags.as_deref()),
        },
    ]
}

fn terms(post: &Post, taxonomy: TaxonomyType, terms: Option<&[Term]>) -> Vec<TaxonomyEntity> {
    terms
        .unwrap_or_default()
        .iter()
        .filter_map(|term| match term.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => Some(TaxonomyEntity::new(
                taxonomy,
                CollectionItem {
                    name: term.name.clone(),
                    slug: slug.to_string(),
                    description: None,
                },
            )),
            _ => {
                warn!(post = post.slug.as_str(), %taxonomy, "Term has no slug, skipping");
                None
            }
        })
        .collect()
}
