use std::path::PathBuf;

use aetree_merge::ConflictReport;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    /// The commit was rejected; nothing was applied.
    #[error("commit conflicts with head:\n{0}")]
    Conflict(ConflictReport),

    #[error("could not acquire the commit lock after {attempts} attempts")]
    LockTimeout { attempts: u32 },

    #[error("{0} is a directory")]
    NotAFile(String),

    #[error("not a repository: {0}")]
    NotARepository(PathBuf),

    #[error("repository already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] aetree_store::StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] aetree_refs::RefError),

    #[error("index error: {0}")]
    Index(#[from] aetree_index::IndexError),

    #[error("merge error: {0}")]
    Merge(#[from] aetree_merge::MergeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;
