use tracing::{info, warn};

use blogshift_common::{
    BlogSeo, BodyBlock, ContentBlock, EntityId, MigrationResult, NewPage, PageFields, Post,
    ResolvedGroup, StoreError, TaxonomyType,
};

use crate::retry::ReadRetryPolicy;
use crate::store::ContentStore;

/// Build the page payload for `post` from its resolved collections.
///
/// A taxonomy with no group at all leaves the matching field unset; a group
/// that resolved to nothing gives an empty id list (or no author).
pub fn assemble(post: &Post, groups: &[ResolvedGroup], page_type: &str) -> NewPage {
    let ids = |taxonomy: TaxonomyType| -> Option<Vec<EntityId>> {
        groups
            .iter()
            .find(|g| g.taxonomy == taxonomy)
            .map(ResolvedGroup::ids)
    };

    NewPage {
        page_type: page_type.to_string(),
        status: "published".to_string(),
        title: post.title.clone(),
        slug: post.slug.clone(),
        fields: PageFields {
            blog_seo: BlogSeo {
                title: post.seo_title.clone(),
                description: post.meta_description.clone(),
                og_image: post.featured_image.clone(),
                og_image_alt: post.featured_image_alt.clone(),
            },
            title: post.title.clone(),
            body: vec![BodyBlock {
                content_block: ContentBlock {
                    content: post.body.clone(),
                },
            }],
            author: ids(TaxonomyType::Author).and_then(|ids| ids.into_iter().next()),
            categories: ids(TaxonomyType::Category),
            tags: ids(TaxonomyType::Tag),
            summary: post.summary.clone(),
            publish_date: post.published.clone(),
        },
    }
}

/// Create `page` unless a page with its slug already exists.
///
/// Existing pages are returned untouched. After a create, the page is read
/// back under `policy`; if it is still not visible the result is `Created`
/// with no data.
pub async fn upsert_page(
    store: &dyn ContentStore,
    policy: &ReadRetryPolicy,
    page: &NewPage,
) -> Result<MigrationResult, StoreError> {
    let slug = page.slug.as_str();

    if let Some(existing) = store.get_page(slug).await? {
        info!(slug, "Page already exists, leaving it alone");
        return Ok(MigrationResult::existing(slug, existing));
    }

    let receipt = store.create_page(page).await?;
    if !receipt.is_pending() {
        return Err(StoreError::Rejected {
            slug: slug.to_string(),
            body: receipt.body,
        });
    }
    info!(slug, "Page write accepted");

    let committed = policy
        .read_until_visible(move || store.get_page(slug))
        .await?;
    if committed.is_none() {
        warn!(slug, "Page created but not yet visible");
    }

    Ok(MigrationResult::created(slug, committed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogshift_common::{
        CollectionItem, ResolutionStatus, ResolvedEntity, TaxonomyEntity,
    };

    fn resolved(taxonomy: TaxonomyType, slug: &str, id: i64) -> ResolvedEntity {
        ResolvedEntity {
            entity: TaxonomyEntity::new(
                taxonomy,
                CollectionItem {
                    name: None,
                    slug: slug.into(),
                    description: None,
                },
            ),
            id: Some(EntityId::Number(id)),
            status: ResolutionStatus::Created,
        }
    }

    fn post() -> Post {
        Post {
            slug: "post-a".into(),
            title: Some("Post A".into()),
            body: Some("<p>hi</p>".into()),
            summary: Some("short".into()),
            seo_title: Some("SEO A".into()),
            meta_description: Some("desc".into()),
            featured_image: Some("https://cdn/x.png".into()),
            featured_image_alt: Some("x".into()),
            published: Some("2021-01-01T00:00:00Z".into()),
            ..Default::default()
        }
    }

    #[test]
    fn assembles_page_from_post_and_ids() {
        let groups = vec![
            ResolvedGroup {
                taxonomy: TaxonomyType::Author,
                items: Some(vec![resolved(TaxonomyType::Author, "a-b", 1)]),
            },
            ResolvedGroup {
                taxonomy: TaxonomyType::Category,
                items: Some(vec![
                    resolved(TaxonomyType::Category, "news", 2),
                    resolved(TaxonomyType::Category, "rust", 3),
                ]),
            },
            ResolvedGroup {
                taxonomy: TaxonomyType::Tag,
                items: None,
            },
        ];

        let page = assemble(&post(), &groups, "blog_page");

        assert_eq!(page.page_type, "blog_page");
        assert_eq!(page.status, "published");
        assert_eq!(page.slug, "post-a");
        assert_eq!(page.fields.author, Some(EntityId::Number(1)));
        assert_eq!(
            page.fields.categories,
            Some(vec![EntityId::Number(2), EntityId::Number(3)])
        );
        assert_eq!(page.fields.tags, Some(vec![]));
        assert_eq!(page.fields.blog_seo.title.as_deref(), Some("SEO A"));
        assert_eq!(page.fields.blog_seo.og_image_alt.as_deref(), Some("x"));
        assert_eq!(page.fields.body[0].content_block.content.as_deref(), Some("<p>hi</p>"));
        assert_eq!(page.fields.publish_date.as_deref(), Some("2021-01-01T00:00:00Z"));
    }

    #[test]
    fn absent_groups_leave_fields_unset() {
        let page = assemble(&post(), &[], "blog_page");
        assert_eq!(page.fields.author, None);
        assert_eq!(page.fields.categories, None);
        assert_eq!(page.fields.tags, None);
    }

    #[test]
    fn author_takes_first_identifier_only() {
        let groups = vec![ResolvedGroup {
            taxonomy: TaxonomyType::Author,
            items: Some(vec![
                resolved(TaxonomyType::Author, "first", 10),
                resolved(TaxonomyType::Author, "second", 11),
            ]),
        }];
        let page = assemble(&post(), &groups, "blog_page");
        assert_eq!(page.fields.author, Some(EntityId::Number(10)));
    }
}
