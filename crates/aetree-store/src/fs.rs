use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use aetree_types::ObjectId;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};
use crate::traits::ObjectStore;

/// Filesystem object store.
///
/// Each object lives at `<root>/<first two hex>/<remaining hex>` as a kind
/// tag line followed by the raw data. Writes go through a temp file in the
/// shard directory and are renamed into place, so readers never observe a
/// partial object.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        let (dir, rest) = id.shard();
        self.root.join(dir).join(rest)
    }

    fn decode(id: &ObjectId, raw: Vec<u8>) -> StoreResult<StoredObject> {
        let corrupt = |reason: &str| StoreError::CorruptObject {
            id: *id,
            reason: reason.to_string(),
        };
        let split = raw
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| corrupt("missing kind header"))?;
        let tag = std::str::from_utf8(&raw[..split]).map_err(|_| corrupt("non-utf8 header"))?;
        let kind = ObjectKind::from_tag(tag).ok_or_else(|| corrupt("unknown kind"))?;
        let object = StoredObject::new(kind, raw[split + 1..].to_vec());

        let computed = object.compute_id();
        if computed != *id {
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        Ok(object)
    }
}

impl ObjectStore for FsObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        match fs::read(self.object_path(id)) {
            Ok(raw) => Self::decode(id, raw).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        let path = self.object_path(&id);
        if path.exists() {
            return Ok(id);
        }
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::CorruptObject {
                id,
                reason: "object path has no parent".into(),
            })?;
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(object.kind.tag().as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.write_all(&object.data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        debug!(id = %id.short_hex(), kind = %object.kind, size = object.size, "stored object");
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id).is_file())
    }

    fn delete(&self, id: &ObjectId) -> StoreResult<bool> {
        match fs::remove_file(self.object_path(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{EntryMode, Tree, TreeEntry};
    use tempfile::TempDir;

    #[test]
    fn objects_are_sharded_on_disk() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path());
        let id = store.write_blob(b"hello").unwrap();

        let (shard, rest) = id.shard();
        assert!(dir.path().join(shard).join(rest).is_file());
        assert!(store.exists(&id).unwrap());
        assert_eq!(store.read_blob(&id).unwrap().data, b"hello".to_vec());
    }

    #[test]
    fn trees_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let blob = FsObjectStore::new(dir.path()).write_blob(b"x").unwrap();
        let tree = Tree::new(vec![TreeEntry::new(EntryMode::Regular, "x.yaml", blob)]);
        let id = FsObjectStore::new(dir.path()).write_tree(&tree).unwrap();

        let reopened = FsObjectStore::new(dir.path());
        assert_eq!(reopened.read_tree(&id).unwrap(), tree);
    }

    #[test]
    fn tampered_object_is_detected() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path());
        let id = store.write_blob(b"original").unwrap();
        let (shard, rest) = id.shard();
        fs::write(dir.path().join(shard).join(rest), b"blob\ntampered").unwrap();

        assert!(matches!(
            store.read(&id),
            Err(StoreError::HashMismatch { .. })
        ));
    }

    #[test]
    fn missing_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path());
        let id = ObjectId::from_bytes(b"nothing");
        assert!(store.read(&id).unwrap().is_none());
        assert!(!store.delete(&id).unwrap());

        let id = store.write_blob(b"temp").unwrap();
        assert!(store.delete(&id).unwrap());
        assert!(!store.exists(&id).unwrap());
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path());
        let id = store.write_blob(b"clean").unwrap();
        let (shard, _) = id.shard();
        let count = fs::read_dir(dir.path().join(shard)).unwrap().count();
        assert_eq!(count, 1);
    }
}
