//! Reference values.

use aetree_types::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical name of the single tracked branch.
pub const HEAD_REF: &str = "refs/heads/master";

/// Canonical name of the exclusive commit lock.
pub const LOCK_REF: &str = "refs/locks";

/// What a named reference points at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ref {
    /// A branch tip.
    Commit(ObjectId),
    /// A held lock, recording who took it so only the holder releases it.
    Lock {
        holder: String,
        acquired_at: DateTime<Utc>,
    },
}

impl Ref {
    pub fn lock(holder: impl Into<String>) -> Self {
        Ref::Lock {
            holder: holder.into(),
            acquired_at: Utc::now(),
        }
    }

    /// The commit this ref points to, if it is a branch ref.
    pub fn commit(&self) -> Option<ObjectId> {
        match self {
            Ref::Commit(id) => Some(*id),
            Ref::Lock { .. } => None,
        }
    }

    pub fn is_lock(&self) -> bool {
        matches!(self, Ref::Lock { .. })
    }

    pub fn lock_holder(&self) -> Option<&str> {
        match self {
            Ref::Lock { holder, .. } => Some(holder),
            Ref::Commit(_) => None,
        }
    }
}
