use aetree_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, Commit, StoredObject, Tree};

/// Content-addressed object store.
///
/// Implementations must uphold:
/// - Objects are immutable once written; the same data always yields the same id.
/// - Writing an object that already exists is a no-op.
/// - Concurrent reads are always safe.
/// - I/O errors are propagated, never swallowed.
pub trait ObjectStore: Send + Sync {
    /// Returns `Ok(None)` if the object does not exist.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its content-addressed ID.
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Delete an object by ID. Returns `true` if the object existed.
    ///
    /// Only safe for unreferenced objects.
    fn delete(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Read an object that must exist.
    fn read_required(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        self.read(id)?.ok_or(StoreError::NotFound(*id))
    }

    fn read_blob(&self, id: &ObjectId) -> StoreResult<Blob> {
        Blob::from_stored_object(self.read_required(id)?)
    }

    fn read_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        Tree::from_stored_object(self.read_required(id)?)
    }

    fn read_commit(&self, id: &ObjectId) -> StoreResult<Commit> {
        Commit::from_stored_object(self.read_required(id)?)
    }

    fn write_blob(&self, data: &[u8]) -> StoreResult<ObjectId> {
        self.write(&Blob::new(data).to_stored_object())
    }

    fn write_tree(&self, tree: &Tree) -> StoreResult<ObjectId> {
        self.write(&tree.to_stored_object()?)
    }

    fn write_commit(&self, commit: &Commit) -> StoreResult<ObjectId> {
        self.write(&commit.to_stored_object()?)
    }
}
