use thiserror::Error;

pub type Result<T> = std::result::Result<T, ButterError>;

#[derive(Debug, Error)]
pub enum ButterError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ButterError {
    fn from(err: reqwest::Error) -> Self {
        ButterError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ButterError {
    fn from(err: serde_json::Error) -> Self {
        ButterError::Parse(err.to_string())
    }
}
