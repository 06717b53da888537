use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aetree_index::{
    adopt_casing, build_tree, dir_casing, flatten_tree, normalize_path, FlatTree, Index,
};
use aetree_merge::{merge_flat, ConflictReport};
use aetree_refs::{FsRefStore, InMemoryRefStore, RefStore};
use aetree_store::{Commit, EntryMode, FsObjectStore, InMemoryObjectStore, ObjectStore};
use aetree_types::{ObjectId, Signature};
use tracing::{debug, info, warn};

use crate::config::RepoConfig;
use crate::error::{RepoError, RepoResult};
use crate::lock::HeadLock;
use crate::walk::{TreeWalk, WalkEntry};

const OBJECTS_DIR: &str = "objects";
const REFS_DIR: &str = "refs";

/// Whether a resolved path is a file or a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Blob,
    Tree,
}

/// A path resolved against a snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Path with the casing stored in the tree.
    pub path: String,
    pub object_id: ObjectId,
    pub kind: EntryKind,
}

impl Entry {
    /// `true` for a tree entry.
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Tree
    }

    /// Last segment of the path.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A versioned tree with a single head branch.
///
/// Reads always go against an immutable snapshot: the commit passed as
/// `as_of`, or whatever the head points to at call time. Writes are staged
/// in an [`Index`] and land through [`Repository::commit`].
pub struct Repository {
    store: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
    root: Option<PathBuf>,
    config: RepoConfig,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish()
    }
}

impl Repository {
    // ---- Lifecycle ----

    /// A repository held entirely in memory, with default settings.
    pub fn in_memory() -> Self {
        Self::in_memory_with_config(RepoConfig::default())
    }

    /// An in-memory repository with the given settings.
    pub fn in_memory_with_config(config: RepoConfig) -> Self {
        Self {
            store: Arc::new(InMemoryObjectStore::new()),
            refs: Arc::new(InMemoryRefStore::new()),
            root: None,
            config,
        }
    }

    /// Initialize an empty repository in `path`.
    pub fn create(path: impl AsRef<Path>, config: RepoConfig) -> RepoResult<Self> {
        let path = path.as_ref();
        if path.join(OBJECTS_DIR).exists() {
            return Err(RepoError::AlreadyInitialized(path.to_path_buf()));
        }
        fs::create_dir_all(path.join(OBJECTS_DIR))?;
        fs::create_dir_all(path.join(REFS_DIR))?;
        info!(path = %path.display(), "created repository");
        Self::open(path, config)
    }

    /// Open an existing repository in `path`.
    pub fn open(path: impl AsRef<Path>, config: RepoConfig) -> RepoResult<Self> {
        let path = path.as_ref();
        if !path.join(OBJECTS_DIR).is_dir() {
            return Err(RepoError::NotARepository(path.to_path_buf()));
        }
        Ok(Self {
            store: Arc::new(FsObjectStore::new(path.join(OBJECTS_DIR))),
            refs: Arc::new(FsRefStore::new(path)),
            root: Some(path.to_path_buf()),
            config,
        })
    }

    /// Remove an on-disk repository and everything in it.
    pub fn destroy(self) -> RepoResult<()> {
        if let Some(root) = &self.root {
            fs::remove_dir_all(root)?;
            info!(path = %root.display(), "destroyed repository");
        }
        Ok(())
    }

    /// Directory of an on-disk repository; `None` when in memory.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Settings the repository was opened with.
    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Object store backing the repository.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    // ---- Snapshot reads ----

    /// Commit the head points to; `None` before the first commit.
    pub fn head(&self) -> RepoResult<Option<ObjectId>> {
        Ok(self.refs.head()?)
    }

    /// Load a commit object.
    pub fn read_commit(&self, id: &ObjectId) -> RepoResult<Commit> {
        Ok(self.store.read_commit(id)?)
    }

    /// Root tree of `as_of`, or of the head when `as_of` is `None`.
    fn root_tree(&self, as_of: Option<ObjectId>) -> RepoResult<Option<ObjectId>> {
        let commit = match as_of {
            Some(id) => Some(id),
            None => self.head()?,
        };
        match commit {
            Some(id) => Ok(Some(self.store.read_commit(&id)?.tree)),
            None => Ok(None),
        }
    }

    /// Look a path up one segment at a time, ignoring case.
    ///
    /// An empty path (or `/`) resolves to the root directory.
    pub fn resolve(&self, path: &str, as_of: Option<ObjectId>) -> RepoResult<Option<Entry>> {
        let Some(root) = self.root_tree(as_of)? else {
            return Ok(None);
        };
        let mut current = Entry {
            path: String::new(),
            object_id: root,
            kind: EntryKind::Tree,
        };
        if path.trim_matches('/').is_empty() {
            return Ok(Some(current));
        }
        for segment in normalize_path(path)?.split('/') {
            if current.kind != EntryKind::Tree {
                return Ok(None);
            }
            let tree = self.store.read_tree(&current.object_id)?;
            let Some(child) = tree.find(segment) else {
                return Ok(None);
            };
            current = Entry {
                path: aetree_index::join(&current.path, &child.name),
                object_id: child.object_id,
                kind: if child.is_directory() {
                    EntryKind::Tree
                } else {
                    EntryKind::Blob
                },
            };
        }
        Ok(Some(current))
    }

    /// File content, `None` when nothing exists at `path`.
    pub fn read(&self, path: &str, as_of: Option<ObjectId>) -> RepoResult<Option<Vec<u8>>> {
        match self.resolve(path, as_of)? {
            Some(entry) if entry.is_directory() => Err(RepoError::NotAFile(entry.path)),
            Some(entry) => Ok(Some(self.store.read_blob(&entry.object_id)?.data)),
            None => Ok(None),
        }
    }

    /// `true` if a file or directory resolves at `path`.
    pub fn exists(&self, path: &str, as_of: Option<ObjectId>) -> RepoResult<bool> {
        Ok(self.resolve(path, as_of)?.is_some())
    }

    /// `true` if `path` resolves to a directory.
    pub fn is_directory(&self, path: &str, as_of: Option<ObjectId>) -> RepoResult<bool> {
        Ok(self
            .resolve(path, as_of)?
            .is_some_and(|e| e.is_directory()))
    }

    /// Immediate children of a directory; empty when it does not exist.
    pub fn entries(&self, dir: &str, as_of: Option<ObjectId>) -> RepoResult<Vec<Entry>> {
        let Some(parent) = self.resolve(dir, as_of)? else {
            return Ok(Vec::new());
        };
        if !parent.is_directory() {
            return Ok(Vec::new());
        }
        let tree = self.store.read_tree(&parent.object_id)?;
        Ok(tree
            .entries
            .into_iter()
            .map(|child| Entry {
                path: aetree_index::join(&parent.path, &child.name),
                object_id: child.object_id,
                kind: if child.is_directory() {
                    EntryKind::Tree
                } else {
                    EntryKind::Blob
                },
            })
            .collect())
    }

    /// Lazy preorder walk beneath `path`, with paths relative to it.
    ///
    /// A missing path or a file yields an empty walk.
    pub fn list(&self, path: &str, as_of: Option<ObjectId>) -> RepoResult<TreeWalk> {
        let root = self
            .resolve(path, as_of)?
            .filter(Entry::is_directory)
            .map(|e| e.object_id);
        Ok(TreeWalk::new(Arc::clone(&self.store), root))
    }

    /// Every file path in the snapshot, in preorder.
    pub fn file_list(&self, as_of: Option<ObjectId>) -> RepoResult<Vec<String>> {
        self.list("", as_of)?
            .filter_map(|entry| match entry {
                Ok(WalkEntry {
                    is_directory: true, ..
                }) => None,
                Ok(e) => Some(Ok(e.path)),
                Err(e) => Some(Err(e)),
            })
            .collect()
    }

    // ---- Staging and commits ----

    /// A staged index on top of the current head.
    pub fn stage(&self) -> RepoResult<Index> {
        let head = self.head()?;
        Ok(Index::from_commit(Arc::clone(&self.store), head)?)
    }

    /// A staged index on top of a specific commit.
    pub fn stage_at(&self, commit: ObjectId) -> RepoResult<Index> {
        Ok(Index::from_commit(Arc::clone(&self.store), Some(commit))?)
    }

    /// Write a commit for `index` without moving the head.
    pub fn create_commit(&self, index: &Index, message: &str) -> RepoResult<ObjectId> {
        if message.trim().is_empty() {
            return Err(RepoError::MissingArgument("commit message"));
        }
        let tree = index.write_tree()?;
        let author = Signature::now(&self.config.author.name, &self.config.author.email);
        let commit = Commit::new(tree, index.base(), author, message);
        let id = self.store.write_commit(&commit)?;
        debug!(commit = %id.short_hex(), parent = ?index.base(), "created commit");
        Ok(id)
    }

    /// Commit `index` and advance the head to it.
    pub fn commit(&self, index: Index, message: &str) -> RepoResult<ObjectId> {
        let commit = self.create_commit(&index, message)?;
        self.advance(commit)
    }

    /// Move the head to `commit` under the commit lock.
    ///
    /// If the head moved since the commit's parent was captured, the two
    /// lines are merged three-way. Conflicting content rejects the commit
    /// with a [`RepoError::Conflict`]; a clean merge lands a new commit with
    /// the merged tree whose parent is the current head. Returns the id the
    /// head now points to.
    pub fn advance(&self, commit_id: ObjectId) -> RepoResult<ObjectId> {
        let commit = self.store.read_commit(&commit_id)?;
        let lock = HeadLock::acquire(Arc::clone(&self.refs), &self.config.lock)?;

        let head = self.refs.head()?;
        let landed = match head {
            None if commit.parent.is_none() => commit_id,
            Some(head) if commit.parent == Some(head) || head == commit_id => commit_id,
            _ => self.merge_onto_head(commit_id, &commit, head)?,
        };
        self.refs.set_head(landed)?;
        lock.release()?;

        info!(commit = %landed.short_hex(), message = %commit.message, "head advanced");
        Ok(landed)
    }

    fn flat(&self, tree: Option<ObjectId>) -> RepoResult<FlatTree> {
        match tree {
            Some(id) => Ok(flatten_tree(self.store.as_ref(), &id)?),
            None => Ok(FlatTree::new()),
        }
    }

    fn merge_onto_head(
        &self,
        commit_id: ObjectId,
        commit: &Commit,
        head: Option<ObjectId>,
    ) -> RepoResult<ObjectId> {
        let base_tree = match commit.parent {
            Some(parent) => Some(self.store.read_commit(&parent)?.tree),
            None => None,
        };
        let head_tree = match head {
            Some(head) => Some(self.store.read_commit(&head)?.tree),
            None => None,
        };
        let base = self.flat(base_tree)?;
        let ours = self.flat(Some(commit.tree))?;
        let theirs = self.flat(head_tree)?;

        let outcome = merge_flat(&base, &ours, &theirs);
        if !outcome.is_clean() {
            let report =
                ConflictReport::build(self.store.as_ref(), &outcome.conflicts, &ours, &theirs)?;
            warn!(
                commit = %commit_id.short_hex(),
                paths = report.len(),
                "commit conflicts with head"
            );
            return Err(RepoError::Conflict(report));
        }

        // head's spelling wins for directories both lines touched
        let casing = dir_casing(&theirs);
        let files: Vec<(String, ObjectId, EntryMode)> = outcome
            .merged
            .values()
            .map(|e| (adopt_casing(&casing, &e.path), e.object_id, e.mode))
            .collect();
        let tree = build_tree(
            self.store.as_ref(),
            files.iter().map(|(path, id, mode)| (path.as_str(), *id, *mode)),
        )?;
        let merged = Commit::new(tree, head, commit.author.clone(), commit.message.clone());
        let merged_id = self.store.write_commit(&merged)?;
        info!(
            commit = %commit_id.short_hex(),
            onto = ?head.map(|h| h.short_hex()),
            merged = %merged_id.short_hex(),
            "rebased concurrent commit onto head"
        );
        Ok(merged_id)
    }

    /// Delete a lock left behind by a crashed writer.
    ///
    /// The lock is removed whoever holds it. Run this only when no writer
    /// is live: a writer releasing its own lock checks and deletes in two
    /// steps, and could remove the lock of a writer that acquired it in
    /// between.
    pub fn force_unlock(&self) -> RepoResult<bool> {
        let removed = self.refs.delete_ref(aetree_refs::LOCK_REF)?;
        if removed {
            warn!("forcibly removed commit lock");
        }
        Ok(removed)
    }
}
