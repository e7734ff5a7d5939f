use thiserror::Error;

use blogshift_common::{StoreError, TaxonomyType};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MigrateError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The store accepted the entity but never returned an identifier for it.
    #[error("{taxonomy} '{slug}' has no identifier after re-reading")]
    Unresolved { taxonomy: TaxonomyType, slug: String },

    /// A post without a slug has no page natural key.
    #[error("post has no slug")]
    MissingSlug,
}
