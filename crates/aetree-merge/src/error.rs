//! Error types for the merge crate.

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("store error: {0}")]
    Store(#[from] aetree_store::StoreError),

    #[error("index error: {0}")]
    Index(#[from] aetree_index::IndexError),
}

pub type MergeResult<T> = Result<T, MergeError>;
