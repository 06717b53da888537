//! The staged index: pending writes on top of a base commit.
//!
//! An [`Index`] holds every file of the tree it was loaded from plus the
//! caller's pending changes, keyed by lowercased path. Nothing is visible
//! to readers of the repository until the index is committed, and dropping
//! an index abandons its changes with no side effects.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

use aetree_store::{EntryMode, ObjectStore};
use aetree_types::ObjectId;
use tracing::debug;

use crate::entry::IndexEntry;
use crate::error::{IndexError, IndexResult};
use crate::path::{normalize_path, path_key};
use crate::tree::{build_tree, flatten_tree};

pub struct Index {
    /// Commit the index was loaded from; becomes the parent on commit.
    base: Option<ObjectId>,
    entries: BTreeMap<String, IndexEntry>,
    modified: bool,
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("base", &self.base)
            .field("entries", &self.entries.len())
            .field("modified", &self.modified)
            .finish()
    }
}

impl Index {
    /// An empty index with no base commit.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            base: None,
            entries: BTreeMap::new(),
            modified: false,
            store,
        }
    }

    /// Load the tree of `commit`, or start empty when there is none yet.
    pub fn from_commit(
        store: Arc<dyn ObjectStore>,
        commit: Option<ObjectId>,
    ) -> IndexResult<Self> {
        let mut index = Self::new(store);
        if let Some(commit_id) = commit {
            let commit = index.store.read_commit(&commit_id)?;
            index.read_tree(&commit.tree)?;
            index.base = Some(commit_id);
        }
        Ok(index)
    }

    /// Replace the contents of the index with the files of `tree_id`.
    pub fn read_tree(&mut self, tree_id: &ObjectId) -> IndexResult<()> {
        let flat = flatten_tree(self.store.as_ref(), tree_id)?;
        let mtime = SystemTime::now();
        self.entries = flat
            .into_iter()
            .map(|(key, e)| {
                let entry = IndexEntry {
                    path: e.path,
                    object_id: e.object_id,
                    mode: e.mode,
                    size: 0,
                    mtime,
                };
                (key, entry)
            })
            .collect();
        self.modified = false;
        Ok(())
    }

    /// Commit the index was loaded from, which becomes the parent.
    pub fn base(&self) -> Option<ObjectId> {
        self.base
    }

    /// `true` once any change has been staged.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Number of staged files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive lookup of a file.
    pub fn get(&self, path: &str) -> Option<&IndexEntry> {
        let path = normalize_path(path).ok()?;
        self.entries.get(&path_key(&path))
    }

    /// `true` if a file is staged at `path`, ignoring case.
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// `true` if at least one file lives beneath `path`.
    pub fn is_directory(&self, path: &str) -> bool {
        normalize_path(path)
            .map(|p| self.first_under(&path_key(&p)).is_some())
            .unwrap_or(false)
    }

    /// Staged files in key order.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    /// Content of a staged file, read back from the object store.
    pub fn read(&self, path: &str) -> IndexResult<Option<Vec<u8>>> {
        match self.get(path) {
            Some(entry) => Ok(Some(self.store.read_blob(&entry.object_id)?.data)),
            None => Ok(None),
        }
    }

    // ---------------------------------------------------------------
    // Stage operations
    // ---------------------------------------------------------------

    /// Stage new content at `path`, returning the path as it will be stored.
    pub fn write(&mut self, path: &str, content: &[u8]) -> IndexResult<String> {
        let object_id = self.store.write_blob(content)?;
        self.write_object(path, object_id, content.len() as u64)
    }

    /// Stage an object that is already in the store.
    pub fn write_object(
        &mut self,
        path: &str,
        object_id: ObjectId,
        size: u64,
    ) -> IndexResult<String> {
        self.insert(path, object_id, EntryMode::Regular, size)
    }

    fn insert(
        &mut self,
        path: &str,
        object_id: ObjectId,
        mode: EntryMode,
        size: u64,
    ) -> IndexResult<String> {
        let path = normalize_path(path)?;
        let key = path_key(&path);
        self.check_collisions(&path, &key)?;

        let path = self.canonical_path(&path);
        let mut entry = IndexEntry::new(path.clone(), object_id, size);
        entry.mode = mode;
        debug!(path = %path, object = %object_id.short_hex(), "staged");
        self.entries.insert(key, entry);
        self.modified = true;
        Ok(path)
    }

    /// Unstage the file at `path`; it is gone from the next commit.
    pub fn remove(&mut self, path: &str) -> IndexResult<IndexEntry> {
        let path = normalize_path(path)?;
        let entry = self
            .entries
            .remove(&path_key(&path))
            .ok_or(IndexError::PathNotFound(path))?;
        self.modified = true;
        Ok(entry)
    }

    /// Remove every file beneath the directory `path`.
    pub fn remove_subtree(&mut self, path: &str) -> IndexResult<Vec<IndexEntry>> {
        let path = normalize_path(path)?;
        let prefix = format!("{}/", path_key(&path));
        let keys: Vec<String> = self
            .entries
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(k, _)| k.clone())
            .collect();
        if keys.is_empty() {
            return Err(IndexError::PathNotFound(path));
        }
        let removed = keys
            .iter()
            .filter_map(|k| self.entries.remove(k))
            .collect::<Vec<_>>();
        debug!(path = %path, files = removed.len(), "removed subtree");
        self.modified = true;
        Ok(removed)
    }

    /// Move a file, keeping its object id.
    ///
    /// Staged as an add at the new path and a remove at the old one; a
    /// case-only rename is allowed.
    pub fn rename(&mut self, old_path: &str, new_path: &str) -> IndexResult<String> {
        let entry = self.remove(old_path)?;
        let key = path_key(&entry.path);
        match self.insert(new_path, entry.object_id, entry.mode, entry.size) {
            Ok(path) => Ok(path),
            Err(e) => {
                self.entries.insert(key, entry);
                Err(e)
            }
        }
    }

    /// Move every file beneath `old_dir` to the same relative path under `new_dir`.
    pub fn rename_subtree(&mut self, old_dir: &str, new_dir: &str) -> IndexResult<()> {
        let old_dir = normalize_path(old_dir)?;
        let new_dir = normalize_path(new_dir)?;
        let snapshot = self.entries.clone();

        let result = self.remove_subtree(&old_dir).and_then(|moved| {
            moved.into_iter().try_for_each(|entry| {
                // ASCII case folding keeps byte offsets, so the suffix lines up.
                let suffix = &entry.path[old_dir.len()..];
                let target = format!("{new_dir}{suffix}");
                self.insert(&target, entry.object_id, entry.mode, entry.size)
                    .map(|_| ())
            })
        });
        if result.is_err() {
            self.entries = snapshot;
        }
        result
    }

    /// Remove `old_path` and stage `content` at `new_path`.
    pub fn replace(
        &mut self,
        old_path: &str,
        new_path: &str,
        content: &[u8],
    ) -> IndexResult<String> {
        let old = self.remove(old_path)?;
        let key = path_key(&old.path);
        match self.write(new_path, content) {
            Ok(path) => Ok(path),
            Err(e) => {
                self.entries.insert(key, old);
                Err(e)
            }
        }
    }

    // ---------------------------------------------------------------
    // Tree building
    // ---------------------------------------------------------------

    /// Write nested tree objects for the staged files and return the root.
    pub fn write_tree(&self) -> IndexResult<ObjectId> {
        build_tree(
            self.store.as_ref(),
            self.entries
                .values()
                .map(|e| (e.path.as_str(), e.object_id, e.mode)),
        )
    }

    // ---------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------

    fn first_under(&self, dir_key: &str) -> Option<&IndexEntry> {
        let prefix = format!("{dir_key}/");
        self.entries
            .range(prefix.clone()..)
            .next()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(_, e)| e)
    }

    fn check_collisions(&self, path: &str, key: &str) -> IndexResult<()> {
        if let Some(existing) = self.first_under(key) {
            return Err(IndexError::PathConflict {
                path: path.to_string(),
                existing: existing.path.clone(),
            });
        }
        let mut ancestor = String::new();
        for segment in key.split('/').take(key.split('/').count() - 1) {
            if !ancestor.is_empty() {
                ancestor.push('/');
            }
            ancestor.push_str(segment);
            if let Some(existing) = self.entries.get(&ancestor) {
                return Err(IndexError::PathConflict {
                    path: path.to_string(),
                    existing: existing.path.clone(),
                });
            }
        }
        Ok(())
    }

    /// Adopt the casing of directories and files that already exist, so
    /// that no two siblings differ only by case.
    fn canonical_path(&self, path: &str) -> String {
        let segments: Vec<&str> = path.split('/').collect();
        let last = segments.len() - 1;
        segments
            .iter()
            .enumerate()
            .map(|(i, segment)| {
                let key = path_key(&segments[..=i].join("/"));
                let existing = if i == last {
                    self.entries.get(&key)
                } else {
                    self.first_under(&key)
                };
                existing
                    .and_then(|e| e.path.split('/').nth(i))
                    .unwrap_or(*segment)
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}
