//! Filesystem reference store.
//!
//! Each ref is a JSON file at `<root>/<canonical name>`. Exclusive creation
//! relies on `O_CREAT | O_EXCL`, so it is atomic across processes sharing
//! the directory; plain writes go through a temp file and rename.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{RefError, Result};
use crate::names::validate_ref_name;
use crate::traits::RefStore;
use crate::types::Ref;

#[derive(Debug, Clone)]
pub struct FsRefStore {
    root: PathBuf,
}

impl FsRefStore {
    /// `root` is the directory that contains `refs/`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn encode(reference: &Ref) -> Result<Vec<u8>> {
        serde_json::to_vec(reference).map_err(|e| RefError::Serialization(e.to_string()))
    }

    fn parent_dir(path: &Path) -> Result<&Path> {
        path.parent().ok_or_else(|| RefError::InvalidName {
            name: path.display().to_string(),
            reason: "ref path has no parent".into(),
        })
    }
}

impl RefStore for FsRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<Ref>> {
        match fs::read(self.ref_path(name)) {
            Ok(raw) => serde_json::from_slice(&raw)
                .map(Some)
                .map_err(|e| RefError::Serialization(e.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_ref(&self, name: &str, reference: &Ref) -> Result<()> {
        validate_ref_name(name)?;
        let path = self.ref_path(name);
        let dir = Self::parent_dir(&path)?;
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&Self::encode(reference)?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| RefError::Io(e.error))?;
        Ok(())
    }

    fn create_ref(&self, name: &str, reference: &Ref) -> Result<()> {
        validate_ref_name(name)?;
        let path = self.ref_path(name);
        let dir = Self::parent_dir(&path)?;
        fs::create_dir_all(dir)?;

        // The ref appears under its name fully written or not at all.
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&Self::encode(reference)?)?;
        tmp.as_file().sync_all()?;
        match tmp.persist_noclobber(&path) {
            Ok(_) => Ok(()),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                debug!(name, "ref already exists");
                Err(RefError::AlreadyExists {
                    name: name.to_string(),
                })
            }
            Err(e) => Err(RefError::Io(e.error)),
        }
    }

    fn delete_ref(&self, name: &str) -> Result<bool> {
        match fs::remove_file(self.ref_path(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Ref)>> {
        let base = self.root.join("refs");
        if !base.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in WalkDir::new(&base).sort_by_file_name() {
            let entry = entry.map_err(|e| RefError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            // Temp files from in-flight writes are not refs.
            if validate_ref_name(&name).is_err() || !name.starts_with(prefix) {
                continue;
            }
            if let Some(reference) = self.read_ref(&name)? {
                out.push((name, reference));
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HEAD_REF, LOCK_REF};
    use aetree_types::ObjectId;
    use std::sync::{Arc, Barrier};
    use tempfile::TempDir;

    #[test]
    fn head_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let id = ObjectId::from_bytes(b"c");
        FsRefStore::new(dir.path()).set_head(id).unwrap();

        assert!(dir.path().join(HEAD_REF).is_file());
        assert_eq!(FsRefStore::new(dir.path()).head().unwrap(), Some(id));
    }

    #[test]
    fn create_ref_is_exclusive_on_disk() {
        let dir = TempDir::new().unwrap();
        let store = FsRefStore::new(dir.path());
        store.create_ref(LOCK_REF, &Ref::lock("one")).unwrap();
        assert!(matches!(
            store.create_ref(LOCK_REF, &Ref::lock("two")),
            Err(RefError::AlreadyExists { .. })
        ));
        assert!(store.delete_ref(LOCK_REF).unwrap());
        assert!(store.read_ref(LOCK_REF).unwrap().is_none());
    }

    #[test]
    fn created_ref_is_complete_and_losers_leave_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let store = FsRefStore::new(dir.path());
        store.create_ref(LOCK_REF, &Ref::lock("one")).unwrap();
        let holder = |store: &FsRefStore| {
            let current = store.read_ref(LOCK_REF).unwrap().unwrap();
            current.lock_holder().map(str::to_string)
        };
        assert_eq!(holder(&store).as_deref(), Some("one"));

        for i in 0..3 {
            let other = Ref::lock(format!("late{i}"));
            assert!(matches!(
                store.create_ref(LOCK_REF, &other),
                Err(RefError::AlreadyExists { .. })
            ));
        }
        assert_eq!(holder(&store).as_deref(), Some("one"));

        let lock_path = dir.path().join(LOCK_REF);
        let siblings: Vec<_> = fs::read_dir(lock_path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(siblings, vec![lock_path]);
    }

    #[test]
    fn only_one_concurrent_creator_wins() {
        let dir = TempDir::new().unwrap();
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = FsRefStore::new(dir.path());
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    store.create_ref(LOCK_REF, &Ref::lock(format!("t{i}"))).is_ok()
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn list_refs_walks_the_tree() {
        let dir = TempDir::new().unwrap();
        let store = FsRefStore::new(dir.path());
        assert!(store.list_refs("").unwrap().is_empty());

        let id = ObjectId::from_bytes(b"c");
        store.set_head(id).unwrap();
        store.create_ref(LOCK_REF, &Ref::lock("me")).unwrap();

        let all = store.list_refs("refs/").unwrap();
        let names: Vec<&str> = all.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec![HEAD_REF, LOCK_REF]);
        assert_eq!(store.list_refs("refs/heads/").unwrap().len(), 1);
    }
}
