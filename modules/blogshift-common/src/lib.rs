pub mod config;
pub mod error;
pub mod types;

pub use config::{BackoffKind, Config};
pub use error::StoreError;
pub use types::*;
