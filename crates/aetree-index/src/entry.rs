//! Index entry type.

use std::time::SystemTime;

use aetree_store::EntryMode;
use aetree_types::ObjectId;
use serde::{Deserialize, Serialize};

/// A file tracked by the staged index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Path with the casing it will be committed under.
    pub path: String,
    pub object_id: ObjectId,
    pub mode: EntryMode,
    pub size: u64,
    /// When the entry was staged or loaded.
    pub mtime: SystemTime,
}

impl IndexEntry {
    pub fn new(path: impl Into<String>, object_id: ObjectId, size: u64) -> Self {
        Self {
            path: path.into(),
            object_id,
            mode: EntryMode::Regular,
            size,
            mtime: SystemTime::now(),
        }
    }

    /// Final path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}
