use aetree_model::{ModelError, ObjectType};
use aetree_repo::{ConflictReport, RepoError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatastoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("{kind} {fqname} already exists")]
    DuplicateName { kind: ObjectType, fqname: String },

    #[error("invalid {kind} name {fqname:?}: {reason}")]
    InvalidFqname {
        kind: ObjectType,
        fqname: String,
        reason: String,
    },

    #[error("path {path:?} does not name a {kind}")]
    InvalidPath { kind: ObjectType, path: String },

    #[error("invalid name filter: {0}")]
    InvalidFilter(String),

    #[error("repository error: {0}")]
    Repo(#[from] RepoError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

impl DatastoreError {
    /// The conflict report when a commit was rejected.
    pub fn conflict(&self) -> Option<&ConflictReport> {
        match self {
            Self::Repo(RepoError::Conflict(report)) => Some(report),
            _ => None,
        }
    }
}

impl From<aetree_index::IndexError> for DatastoreError {
    fn from(e: aetree_index::IndexError) -> Self {
        Self::Repo(RepoError::Index(e))
    }
}

pub type DatastoreResult<T> = Result<T, DatastoreError>;
