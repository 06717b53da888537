//! Lazy depth-first listing of a tree snapshot.

use std::sync::Arc;

use aetree_index::join;
use aetree_store::{ObjectStore, TreeEntry};
use aetree_types::ObjectId;

use crate::error::RepoResult;

/// One node produced by a [`TreeWalk`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkEntry {
    /// Path relative to the directory the walk started from.
    pub path: String,
    pub is_directory: bool,
    pub object_id: ObjectId,
}

/// Preorder iterator over everything beneath a directory.
///
/// Subtrees are read from the store only when the walk reaches them. The
/// walk reads one immutable snapshot, so a clone taken at any point (or
/// [`TreeWalk::restart`]) replays the same sequence.
#[derive(Clone)]
pub struct TreeWalk {
    store: Arc<dyn ObjectStore>,
    root: Option<ObjectId>,
    started: bool,
    stack: Vec<(String, std::vec::IntoIter<TreeEntry>)>,
}

impl TreeWalk {
    /// `root` is the tree to walk; `None` yields nothing.
    pub fn new(store: Arc<dyn ObjectStore>, root: Option<ObjectId>) -> Self {
        Self {
            store,
            root,
            started: false,
            stack: Vec::new(),
        }
    }

    /// A fresh walk over the same snapshot.
    pub fn restart(&self) -> Self {
        Self::new(Arc::clone(&self.store), self.root)
    }

    fn push(&mut self, prefix: String, tree: &ObjectId) -> RepoResult<()> {
        let tree = self.store.read_tree(tree)?;
        self.stack.push((prefix, tree.entries.into_iter()));
        Ok(())
    }
}

impl std::fmt::Debug for TreeWalk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeWalk")
            .field("root", &self.root)
            .field("depth", &self.stack.len())
            .finish()
    }
}

impl Iterator for TreeWalk {
    type Item = RepoResult<WalkEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            let root = self.root?;
            if let Err(e) = self.push(String::new(), &root) {
                return Some(Err(e));
            }
        }
        loop {
            let (prefix, entries) = self.stack.last_mut()?;
            let Some(entry) = entries.next() else {
                self.stack.pop();
                continue;
            };
            let path = join(prefix, &entry.name);
            if entry.is_directory() {
                if let Err(e) = self.push(path.clone(), &entry.object_id) {
                    return Some(Err(e));
                }
            }
            return Some(Ok(WalkEntry {
                path,
                is_directory: entry.is_directory(),
                object_id: entry.object_id,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aetree_index::build_tree;
    use aetree_store::{EntryMode, InMemoryObjectStore};

    fn sample() -> (Arc<dyn ObjectStore>, ObjectId) {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new());
        let blob = store.write_blob(b"x").unwrap();
        let files = ["b.yaml", "a/one.yaml", "a/sub/two.yaml", "c/three.yaml"];
        let root = build_tree(
            store.as_ref(),
            files.iter().map(|p| (*p, blob, EntryMode::Regular)),
        )
        .unwrap();
        (store, root)
    }

    #[test]
    fn preorder_with_directories_before_children() {
        let (store, root) = sample();
        let listed: Vec<(String, bool)> = TreeWalk::new(store, Some(root))
            .map(|e| e.map(|e| (e.path, e.is_directory)))
            .collect::<RepoResult<_>>()
            .unwrap();
        let expected = [
            ("a", true),
            ("a/one.yaml", false),
            ("a/sub", true),
            ("a/sub/two.yaml", false),
            ("b.yaml", false),
            ("c", true),
            ("c/three.yaml", false),
        ];
        assert_eq!(
            listed,
            expected
                .iter()
                .map(|(p, d)| (p.to_string(), *d))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn clone_mid_walk_resumes_and_restart_replays() {
        let (store, root) = sample();
        let mut walk = TreeWalk::new(store, Some(root));
        walk.next();
        walk.next();
        let rest: Vec<String> = walk.clone().map(|e| e.unwrap().path).collect();
        assert_eq!(rest.first().map(String::as_str), Some("a/sub"));
        assert_eq!(walk.count(), 5);

        let (store, root) = sample();
        let walk = TreeWalk::new(store, Some(root));
        assert_eq!(walk.restart().count(), 7);
    }

    #[test]
    fn no_root_is_empty() {
        let (store, _) = sample();
        assert_eq!(TreeWalk::new(store, None).count(), 0);
    }
}
