pub mod error;
pub mod types;

pub use error::{ButterError, Result};
pub use types::{ApiResponse, CollectionWrite, ContentResponse, PageMeta, Paginated, WriteResponse};

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const DEFAULT_BASE_URL: &str = "https://api.buttercms.com/v2";

/// Page size used when walking paginated list endpoints.
const LIST_PAGE_SIZE: u32 = 100;

pub struct ButterClient {
    client: reqwest::Client,
    base_url: String,
    read_token: String,
    write_token: Option<String>,
}

impl ButterClient {
    pub fn new(base_url: &str, read_token: &str, write_token: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            read_token: read_token.to_string(),
            write_token: write_token.map(String::from),
        })
    }

    /// Fetch one page of blog posts.
    pub async fn list_posts<T: DeserializeOwned>(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Paginated<T>> {
        let url = format!("{}/posts/", self.base_url);
        let page = page.to_string();
        let page_size = page_size.to_string();
        self.get_json(&url, &[("page", page.as_str()), ("page_size", page_size.as_str())])
            .await
    }

    /// Fetch every blog post, following `meta.next_page` until exhausted.
    pub async fn list_all_posts<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            let resp: Paginated<T> = self.list_posts(page, LIST_PAGE_SIZE).await?;
            all.extend(resp.data);
            match resp.meta.next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }
        tracing::info!(count = all.len(), "Fetched blog posts");
        Ok(all)
    }

    /// Fetch every page of the given page type.
    pub async fn list_all_pages<T: DeserializeOwned>(&self, page_type: &str) -> Result<Vec<T>> {
        let url = format!("{}/pages/{}/", self.base_url, page_type);
        let page_size = LIST_PAGE_SIZE.to_string();
        let mut all = Vec::new();
        let mut page = 1u32;
        loop {
            let page_str = page.to_string();
            let resp: Paginated<T> = self
                .get_json(
                    &url,
                    &[("page", page_str.as_str()), ("page_size", page_size.as_str())],
                )
                .await?;
            all.extend(resp.data);
            match resp.meta.next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }
        tracing::info!(page_type, count = all.len(), "Fetched pages");
        Ok(all)
    }

    /// Retrieve a single page by slug. `Ok(None)` when the page does not exist.
    pub async fn retrieve_page<T: DeserializeOwned>(
        &self,
        page_type: &str,
        slug: &str,
    ) -> Result<Option<T>> {
        let url = format!("{}/pages/{}/{}/", self.base_url, page_type, slug);
        let resp = self.read_request(&url, &[]).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            tracing::debug!(page_type, slug, "Page not found");
            return Ok(None);
        }
        let body: ApiResponse<T> = Self::parse_success(resp).await?;
        Ok(Some(body.data))
    }

    /// Retrieve the first item of collection `key` whose `slug` field matches.
    pub async fn retrieve_collection_item<T: DeserializeOwned>(
        &self,
        key: &str,
        slug: &str,
    ) -> Result<Option<T>> {
        let url = format!("{}/content/", self.base_url);
        let resp: ContentResponse<T> = self
            .get_json(&url, &[("keys", key), ("fields.slug", slug)])
            .await?;

        Ok(resp
            .data
            .into_iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, items)| items.into_iter().next()))
    }

    /// Create a published collection item. The write API does not return
    /// the assigned id; re-read the item to learn it.
    pub async fn create_collection_item<F: Serialize>(
        &self,
        key: &str,
        fields: &F,
    ) -> Result<WriteResponse> {
        let url = format!("{}/content/", self.base_url);
        let body = CollectionWrite {
            key,
            status: "published",
            fields: [fields],
        };
        let resp = self.post_write(&url, &body).await?;
        tracing::info!(key, status = ?resp.status, "Collection item write accepted");
        Ok(resp)
    }

    /// Create a page from a full page payload.
    pub async fn create_page<P: Serialize>(&self, page: &P) -> Result<WriteResponse> {
        let url = format!("{}/pages/", self.base_url);
        self.post_write(&url, page).await
    }

    fn read_request(&self, url: &str, query: &[(&str, &str)]) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .query(&[("auth_token", self.read_token.as_str())])
            .query(query)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        tracing::debug!(url, "ButterCMS read");
        let resp = self.read_request(url, query).send().await?;
        Self::parse_success(resp).await
    }

    /// POST to a write endpoint. 2xx and 400 (validation) bodies are returned
    /// as a `WriteResponse` so callers can inspect the status; anything else
    /// is an `Api` error.
    async fn post_write<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<WriteResponse> {
        let token = self.write_token.as_deref().ok_or_else(|| ButterError::Api {
            status: 401,
            message: "no write token configured".to_string(),
        })?;

        let resp = self
            .client
            .post(url)
            .header("Authorization", format!("Token {token}"))
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() && status != StatusCode::BAD_REQUEST {
            let message = resp.text().await.unwrap_or_default();
            return Err(ButterError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = resp.text().await?;
        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        Ok(WriteResponse::from_body(status.as_u16(), body))
    }

    async fn parse_success<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ButterError::Api {
                status: status.as_u16(),
                message,
            });
        }
        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
