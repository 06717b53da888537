//! Error types for reference operations.

use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    #[error("ref not found: {name}")]
    NotFound { name: String },

    /// Exclusive creation found the ref already present.
    #[error("ref already exists: {name}")]
    AlreadyExists { name: String },

    #[error("invalid ref name: {name}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
