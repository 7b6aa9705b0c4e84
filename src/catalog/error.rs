use thiserror::Error;

use crate::storage::StorageError;

/// Failures surfaced by catalog operations. Every variant carries a message
/// that can be shown to the user as-is.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Bad input caught before any store call.
    #[error("{0}")]
    Validation(String),
    /// The object store refused an upload that the workflow depends on.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    /// A relational query failed. Earlier steps of the workflow may have
    /// already committed.
    #[error("database error: {0:#}")]
    Persistence(anyhow::Error),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("not signed in")]
    Unauthenticated,
}

/// The `db` layer reports failures as `anyhow` errors with query context, so
/// anything it bubbles up is a persistence failure.
impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        CatalogError::Persistence(err)
    }
}

impl CatalogError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        CatalogError::Validation(message.into())
    }

    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        CatalogError::NotFound { entity, id }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
