//! The versioned tree behind aetree.
//!
//! [`Repository`] wraps a content-addressed object store and a ref store
//! with a single head branch:
//!
//! - reads resolve paths case-insensitively against an immutable snapshot
//! - writes are staged in an [`aetree_index::Index`] and become visible only
//!   once committed
//! - advancing the head takes the commit lock ([`HeadLock`]) and rejects a
//!   commit whose content conflicts with commits that landed after its parent
//!
//! The lock is the only synchronization point; staging and reading never
//! block.

pub mod config;
pub mod error;
pub mod lock;
pub mod repository;
pub mod walk;

pub use aetree_index::Index;
pub use aetree_merge::{ChangeStatus, ConflictEntry, ConflictReport};
pub use config::{AuthorConfig, LockPolicy, RepoConfig};
pub use error::{RepoError, RepoResult};
pub use lock::HeadLock;
pub use repository::{Entry, EntryKind, Repository};
pub use walk::{TreeWalk, WalkEntry};
