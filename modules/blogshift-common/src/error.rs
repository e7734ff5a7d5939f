use thiserror::Error;

/// Failures of the content store: transport errors, non-success
/// responses, undecodable bodies, and rejected page writes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Store API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    /// A page write that did not come back `pending`.
    #[error("{}", rejected_message(.slug, .body))]
    Rejected {
        slug: String,
        body: serde_json::Value,
    },
}

fn rejected_message(slug: &str, body: &serde_json::Value) -> String {
    serde_json::json!({ "slug": slug, "data": body }).to_string()
}
