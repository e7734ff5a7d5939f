use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Pagination block returned by list endpoints (`/posts/`, `/pages/<type>/`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next_page: Option<u32>,
    #[serde(default)]
    pub previous_page: Option<u32>,
}

/// A paginated list response.
#[derive(Debug, Clone, Deserialize)]
pub struct Paginated<T> {
    #[serde(default)]
    pub meta: PageMeta,
    pub data: Vec<T>,
}

/// Wrapper for single-record responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// `/content/` responses are keyed by collection key.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentResponse<T> {
    pub data: HashMap<String, Vec<T>>,
}

/// Body of a collection item write. ButterCMS expects `fields` to be an
/// array even when a single item is created.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionWrite<'a, F: Serialize> {
    pub key: &'a str,
    pub status: &'a str,
    pub fields: [&'a F; 1],
}

/// Outcome of a write call. The write API accepts the request
/// asynchronously and answers with `{"status": "pending"}`; validation
/// failures come back as 400 with a field-keyed error body.
#[derive(Debug, Clone)]
pub struct WriteResponse {
    pub http_status: u16,
    pub status: Option<String>,
    pub body: serde_json::Value,
}

impl WriteResponse {
    pub fn from_body(http_status: u16, body: serde_json::Value) -> Self {
        let status = body
            .get("status")
            .and_then(|s| s.as_str())
            .map(String::from);
        Self {
            http_status,
            status,
            body,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status.as_deref() == Some("pending")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_response_reads_pending_status() {
        let resp = WriteResponse::from_body(202, serde_json::json!({"status": "pending"}));
        assert!(resp.is_pending());
    }

    #[test]
    fn validation_body_is_not_pending() {
        let resp = WriteResponse::from_body(
            400,
            serde_json::json!({"slug": ["Page with this slug already exists."]}),
        );
        assert_eq!(resp.status, None);
        assert!(!resp.is_pending());
    }

    #[test]
    fn collection_write_wraps_fields_in_array() {
        let fields = serde_json::json!({"name": "News", "slug": "news"});
        let body = CollectionWrite {
            key: "blog_category",
            status: "published",
            fields: [&fields],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["fields"][0]["slug"], "news");
        assert_eq!(json["status"], "published");
    }

    #[test]
    fn paginated_tolerates_missing_meta() {
        let page: Paginated<serde_json::Value> =
            serde_json::from_value(serde_json::json!({"data": [{"slug": "a"}]})).unwrap();
        assert_eq!(page.data.len(), 1);
        assert!(page.meta.next_page.is_none());
    }
}
