use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// The document could not be read as an envelope; the entity is unreadable.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("field {field:?} is not defined on {owner}")]
    InvalidFieldReference { field: String, owner: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ModelError {
    pub(crate) fn malformed(reason: impl std::fmt::Display) -> Self {
        Self::MalformedDocument(reason.to_string())
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
