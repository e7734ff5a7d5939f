// ContentStore is the only seam between the migration engine and the CMS.
// ButterStore backs it with the ButterCMS REST API; MockContentStore
// (testing.rs) backs it in memory.

use async_trait::async_trait;

use blogshift_common::{
    CollectionItem, NewPage, Post, StoreError, StoredEntity, StoredPage, TaxonomyType,
};
use buttercms_client::{ButterClient, ButterError, WriteResponse};

/// What the store said about an accepted write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteReceipt {
    pub status: Option<String>,
    pub body: serde_json::Value,
}

impl WriteReceipt {
    pub fn pending() -> Self {
        Self {
            status: Some("pending".to_string()),
            body: serde_json::json!({ "status": "pending" }),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status.as_deref() == Some("pending")
    }
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Every post in the source blog.
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError>;

    /// Every already-migrated page.
    async fn list_pages(&self) -> Result<Vec<StoredPage>, StoreError>;

    /// Look up a collection item by natural key. `Ok(None)` is not an error.
    async fn get_entity(
        &self,
        taxonomy: TaxonomyType,
        natural_key: &str,
    ) -> Result<Option<StoredEntity>, StoreError>;

    /// Create a published collection item. Fails on transport or non-2xx.
    async fn create_entity(
        &self,
        taxonomy: TaxonomyType,
        fields: &CollectionItem,
    ) -> Result<WriteReceipt, StoreError>;

    async fn get_page(&self, slug: &str) -> Result<Option<StoredPage>, StoreError>;

    /// Create a page. Validation rejections come back as a receipt whose
    /// status is not `pending`; only transport failures are errors.
    async fn create_page(&self, page: &NewPage) -> Result<WriteReceipt, StoreError>;
}

/// ContentStore over the ButterCMS REST API.
pub struct ButterStore {
    client: ButterClient,
    page_type: String,
}

impl ButterStore {
    pub fn new(client: ButterClient, page_type: &str) -> Self {
        Self {
            client,
            page_type: page_type.to_string(),
        }
    }
}

fn store_error(err: ButterError) -> StoreError {
    match err {
        ButterError::Network(msg) => StoreError::Network(msg),
        ButterError::Api { status, message } => StoreError::Api { status, message },
        ButterError::Parse(msg) => StoreError::Parse(msg),
    }
}

fn receipt(resp: WriteResponse) -> WriteReceipt {
    WriteReceipt {
        status: resp.status,
        body: resp.body,
    }
}

#[async_trait]
impl ContentStore for ButterStore {
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        self.client.list_all_posts().await.map_err(store_error)
    }

    async fn list_pages(&self) -> Result<Vec<StoredPage>, StoreError> {
        self.client
            .list_all_pages(&self.page_type)
            .await
            .map_err(store_error)
    }

    async fn get_entity(
        &self,
        taxonomy: TaxonomyType,
        natural_key: &str,
    ) -> Result<Option<StoredEntity>, StoreError> {
        self.client
            .retrieve_collection_item(taxonomy.collection_key(), natural_key)
            .await
            .map_err(store_error)
    }

    async fn create_entity(
        &self,
        taxonomy: TaxonomyType,
        fields: &CollectionItem,
    ) -> Result<WriteReceipt, StoreError> {
        let resp = self
            .client
            .create_collection_item(taxonomy.collection_key(), fields)
            .await
            .map_err(store_error)?;

        if !(200..300).contains(&resp.http_status) {
            return Err(StoreError::Api {
                status: resp.http_status,
                message: resp.body.to_string(),
            });
        }
        Ok(receipt(resp))
    }

    async fn get_page(&self, slug: &str) -> Result<Option<StoredPage>, StoreError> {
        self.client
            .retrieve_page(&self.page_type, slug)
            .await
            .map_err(store_error)
    }

    async fn create_page(&self, page: &NewPage) -> Result<WriteReceipt, StoreError> {
        self.client
            .create_page(page)
            .await
            .map(receipt)
            .map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn butter_errors_map_onto_store_errors() {
        let err = store_error(ButterError::Api {
            status: 503,
            message: "down".into(),
        });
        assert_eq!(
            err,
            StoreError::Api {
                status: 503,
                message: "down".into()
            }
        );
        assert!(matches!(
            store_error(ButterError::Network("reset".into())),
            StoreError::Network(_)
        ));
    }

    #[test]
    fn receipt_keeps_status_and_body() {
        let r = receipt(WriteResponse::from_body(
            400,
            serde_json::json!({"slug": ["taken"]}),
        ));
        assert!(!r.is_pending());
        assert_eq!(r.body["slug"][0], "taken");
        assert!(WriteReceipt::pending().is_pending());
    }
}
