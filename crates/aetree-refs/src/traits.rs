//! The [`RefStore`] trait defining the reference storage interface.

use aetree_types::ObjectId;

use crate::error::Result;
use crate::types::{Ref, HEAD_REF};

/// Storage backend for named references.
///
/// Implementations must be thread-safe and, for [`RefStore::create_ref`],
/// atomic: of any number of concurrent callers creating the same name,
/// exactly one succeeds.
pub trait RefStore: Send + Sync {
    /// Returns `Ok(None)` if the ref does not exist.
    fn read_ref(&self, name: &str) -> Result<Option<Ref>>;

    /// Create or overwrite a ref.
    fn write_ref(&self, name: &str, reference: &Ref) -> Result<()>;

    /// Create a ref only if it does not exist yet.
    ///
    /// Fails with `RefError::AlreadyExists` otherwise.
    fn create_ref(&self, name: &str, reference: &Ref) -> Result<()>;

    /// Returns `Ok(true)` if the ref existed and was deleted.
    fn delete_ref(&self, name: &str) -> Result<bool>;

    /// List all refs whose canonical name starts with `prefix`, sorted by name.
    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Ref)>>;

    /// The commit the head branch points to, `None` for an empty repository.
    fn head(&self) -> Result<Option<ObjectId>> {
        Ok(self.read_ref(HEAD_REF)?.and_then(|r| r.commit()))
    }

    fn set_head(&self, commit: ObjectId) -> Result<()> {
        self.write_ref(HEAD_REF, &Ref::Commit(commit))
    }
}
