pub mod collections;
pub mod error;
pub mod extract;
pub mod migrator;
pub mod pages;
pub mod retry;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use collections::{upsert_entity, CollectionRegistry, CollectionResolver};
pub use error::MigrateError;
pub use extract::extract;
pub use migrator::{MigrationSummary, Migrator};
pub use pages::{assemble, upsert_page};
pub use retry::ReadRetryPolicy;
pub use store::{ButterStore, ContentStore, WriteReceipt};
