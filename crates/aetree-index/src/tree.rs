//! Conversion between nested tree objects and flat path maps.

use std::collections::BTreeMap;

use aetree_store::{EntryMode, ObjectStore, Tree, TreeEntry};
use aetree_types::ObjectId;

use crate::error::IndexResult;
use crate::path::{join, path_key};

/// A file in a flattened tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatEntry {
    pub path: String,
    pub object_id: ObjectId,
    pub mode: EntryMode,
}

/// Every file reachable from a root tree, keyed by lowercased path.
pub type FlatTree = BTreeMap<String, FlatEntry>;

/// Walk a tree object and collect every file beneath it.
pub fn flatten_tree(store: &dyn ObjectStore, tree_id: &ObjectId) -> IndexResult<FlatTree> {
    let mut out = FlatTree::new();
    flatten_into(store, tree_id, "", &mut out)?;
    Ok(out)
}

fn flatten_into(
    store: &dyn ObjectStore,
    tree_id: &ObjectId,
    prefix: &str,
    out: &mut FlatTree,
) -> IndexResult<()> {
    let tree = store.read_tree(tree_id)?;
    for entry in tree.entries {
        let path = join(prefix, &entry.name);
        if entry.is_directory() {
            flatten_into(store, &entry.object_id, &path, out)?;
        } else {
            out.insert(
                path_key(&path),
                FlatEntry {
                    path,
                    object_id: entry.object_id,
                    mode: entry.mode,
                },
            );
        }
    }
    Ok(())
}

/// Lowercased directory path to the spelling `tree` stores it under.
pub type DirCasing = BTreeMap<String, String>;

/// Collect the stored spelling of every directory in a flattened tree.
pub fn dir_casing(tree: &FlatTree) -> DirCasing {
    let mut dirs = DirCasing::new();
    for entry in tree.values() {
        for (end, _) in entry.path.match_indices('/') {
            let dir = &entry.path[..end];
            dirs.entry(path_key(dir)).or_insert_with(|| dir.to_string());
        }
    }
    dirs
}

/// Respell the directories along `path` the way `dirs` has them.
///
/// Segments `dirs` does not know keep their own casing; the file name is
/// never touched.
pub fn adopt_casing(dirs: &DirCasing, path: &str) -> String {
    let Some((dir, name)) = path.rsplit_once('/') else {
        return path.to_string();
    };
    let mut key = String::new();
    let mut cased = String::new();
    for segment in dir.split('/') {
        key = join(&key, &path_key(segment));
        cased = match dirs.get(&key) {
            Some(stored) => stored.clone(),
            None => join(&cased, segment),
        };
    }
    join(&cased, name)
}

#[derive(Default)]
struct DirNode {
    files: BTreeMap<String, TreeEntry>,
    // keyed by lowercased name; the first spelling seen is the one written
    dirs: BTreeMap<String, (String, DirNode)>,
}

impl DirNode {
    fn insert(&mut self, path: &str, object_id: ObjectId, mode: EntryMode) {
        match path.split_once('/') {
            Some((dir, rest)) => self
                .dirs
                .entry(path_key(dir))
                .or_insert_with(|| (dir.to_string(), DirNode::default()))
                .1
                .insert(rest, object_id, mode),
            None => {
                self.files
                    .entry(path_key(path))
                    .or_insert_with(|| TreeEntry::new(mode, path, object_id));
            }
        }
    }

    fn write(self, store: &dyn ObjectStore) -> IndexResult<ObjectId> {
        let mut entries: Vec<TreeEntry> = self.files.into_values().collect();
        for (_, (name, child)) in self.dirs {
            let id = child.write(store)?;
            entries.push(TreeEntry::new(EntryMode::Directory, name, id));
        }
        Ok(store.write_tree(&Tree::new(entries))?)
    }
}

/// Write nested tree objects for a set of file paths and return the root id.
///
/// Directories exist only as ancestors of files, so an empty input yields
/// the empty tree. Paths that differ only in case fold into one entry that
/// keeps the first spelling given.
pub fn build_tree<'a, I>(store: &dyn ObjectStore, files: I) -> IndexResult<ObjectId>
where
    I: IntoIterator<Item = (&'a str, ObjectId, EntryMode)>,
{
    let mut root = DirNode::default();
    for (path, object_id, mode) in files {
        root.insert(path, object_id, mode);
    }
    root.write(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aetree_store::InMemoryObjectStore;

    #[test]
    fn build_then_flatten_restores_paths() {
        let store = InMemoryObjectStore::new();
        let a = store.write_blob(b"a").unwrap();
        let b = store.write_blob(b"b").unwrap();
        let root = build_tree(
            &store,
            vec![
                ("Dom/__domain__.yaml", a, EntryMode::Regular),
                ("Dom/NS/Klass.class/__class__.yaml", b, EntryMode::Regular),
            ],
        )
        .unwrap();

        let top = store.read_tree(&root).unwrap();
        assert_eq!(top.len(), 1);
        assert!(top.get("Dom").unwrap().is_directory());

        let flat = flatten_tree(&store, &root).unwrap();
        let paths: Vec<&str> = flat.values().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["Dom/NS/Klass.class/__class__.yaml", "Dom/__domain__.yaml"]
        );
        assert!(flat.contains_key("dom/ns/klass.class/__class__.yaml"));
    }

    #[test]
    fn empty_input_is_the_empty_tree() {
        let store = InMemoryObjectStore::new();
        let root = build_tree(&store, Vec::<(&str, ObjectId, EntryMode)>::new()).unwrap();
        assert!(store.read_tree(&root).unwrap().is_empty());
        assert!(flatten_tree(&store, &root).unwrap().is_empty());
    }

    #[test]
    fn directories_differing_in_case_fold_into_one() {
        let store = InMemoryObjectStore::new();
        let x = store.write_blob(b"x").unwrap();
        let y = store.write_blob(b"y").unwrap();
        let root = build_tree(
            &store,
            vec![
                ("Foo/x.yaml", x, EntryMode::Regular),
                ("foo/y.yaml", y, EntryMode::Regular),
            ],
        )
        .unwrap();

        let top = store.read_tree(&root).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top.entries[0].name, "Foo");
        let paths: Vec<String> = flatten_tree(&store, &root)
            .unwrap()
            .into_values()
            .map(|e| e.path)
            .collect();
        assert_eq!(paths, vec!["Foo/x.yaml", "Foo/y.yaml"]);
    }

    #[test]
    fn adopt_casing_follows_stored_directories() {
        let store = InMemoryObjectStore::new();
        let id = store.write_blob(b"a").unwrap();
        let root = build_tree(&store, vec![("Acme/Infra/a.yaml", id, EntryMode::Regular)])
            .unwrap();
        let dirs = dir_casing(&flatten_tree(&store, &root).unwrap());

        assert_eq!(dirs.get("acme/infra").map(String::as_str), Some("Acme/Infra"));
        assert_eq!(adopt_casing(&dirs, "ACME/infra/New/b.YAML"), "Acme/Infra/New/b.YAML");
        assert_eq!(adopt_casing(&dirs, "top.yaml"), "top.yaml");
    }
}
