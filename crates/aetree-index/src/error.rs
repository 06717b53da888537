//! Error types for the index crate.

use aetree_types::ObjectId;

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("path not found in index: {0}")]
    PathNotFound(String),

    /// A file would shadow a directory or the other way round.
    #[error("path conflict: {path} collides with {existing}")]
    PathConflict { path: String, existing: String },

    #[error("object not found in store: {0:?}")]
    ObjectNotFound(ObjectId),

    #[error("store error: {0}")]
    Store(#[from] aetree_store::StoreError),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
