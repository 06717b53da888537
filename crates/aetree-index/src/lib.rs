//! The staged index for aetree.
//!
//! Writers stage changes into their own [`Index`] independently; staging
//! never blocks and never touches history. The repository turns an index
//! into a commit with [`Index::write_tree`].
//!
//! Paths are compared case-insensitively. A newly staged path adopts the
//! casing of any directory or file that already exists along it.

pub mod entry;
pub mod error;
pub mod index;
pub mod path;
pub mod tree;

pub use entry::IndexEntry;
pub use error::{IndexError, IndexResult};
pub use index::Index;
pub use path::{join, normalize_path, path_key};
pub use tree::{adopt_casing, build_tree, dir_casing, flatten_tree, DirCasing, FlatEntry, FlatTree};
