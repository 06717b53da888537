//! Structured description of a rejected commit.

use std::collections::BTreeMap;

use aetree_diff::diff_blobs;
use aetree_index::FlatTree;
use aetree_store::ObjectStore;
use serde::{Deserialize, Serialize};

use crate::error::MergeResult;

/// How a conflicting path differs on head compared with the rejected commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Added,
    Deleted,
    Modified,
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Added => "added",
            Self::Deleted => "deleted",
            Self::Modified => "modified",
        })
    }
}

/// How one conflicting path differs between the rejected commit and head.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictEntry {
    pub status: ChangeStatus,
    /// `+ line` for lines only head has, `- line` for lines only the
    /// rejected commit has.
    pub diffs: Vec<String>,
}

/// Per-path differences for every conflicting path, keyed by path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub paths: BTreeMap<String, ConflictEntry>,
}

impl ConflictReport {
    /// Diff each conflicting key from `ours` (old side) to `theirs` (new side).
    pub fn build(
        store: &dyn ObjectStore,
        keys: &[String],
        ours: &FlatTree,
        theirs: &FlatTree,
    ) -> MergeResult<Self> {
        let mut paths = BTreeMap::new();
        for key in keys {
            let (old, new) = (ours.get(key), theirs.get(key));
            let status = match (old, new) {
                (None, Some(_)) => ChangeStatus::Added,
                (Some(_), None) => ChangeStatus::Deleted,
                _ => ChangeStatus::Modified,
            };
            let read = |entry: Option<&aetree_index::FlatEntry>| -> MergeResult<Vec<u8>> {
                match entry {
                    Some(e) => Ok(store.read_blob(&e.object_id)?.data),
                    None => Ok(Vec::new()),
                }
            };
            let diffs = diff_blobs(&read(old)?, &read(new)?).markers();
            let path = new
                .or(old)
                .map(|e| e.path.clone())
                .unwrap_or_else(|| key.clone());
            paths.insert(path, ConflictEntry { status, diffs });
        }
        Ok(Self { paths })
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn get(&self, path: &str) -> Option<&ConflictEntry> {
        self.paths.get(path)
    }
}

impl std::fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (path, entry) in &self.paths {
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "{path} ({})", entry.status)?;
            for line in &entry.diffs {
                write!(f, "\n  {line}")?;
            }
        }
        Ok(())
    }
}
