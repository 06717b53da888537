//! Content-addressed object storage for aetree.
//!
//! Every piece of versioned state is an immutable object keyed by its
//! BLAKE3 hash (domain-separated by object kind):
//!
//! - [`Blob`] -- raw document or script bytes
//! - [`Tree`] -- directory listing mapping names to object references
//! - [`Commit`] -- snapshot of a root tree with author, message, and parent
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsObjectStore`] -- sharded `objects/ab/cdef...` files on disk
//!
//! Objects are never rewritten once stored, so reads need no locking.

pub mod error;
pub mod fs;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use memory::InMemoryObjectStore;
pub use object::{Blob, Commit, EntryMode, ObjectKind, StoredObject, Tree, TreeEntry};
pub use traits::ObjectStore;
