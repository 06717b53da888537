//! Automation datastore on top of the aetree versioned tree.
//!
//! Entities from [`aetree_model`] are stored one document per file, laid out
//! by [`paths`]. A [`Datastore`] reads every lookup against one snapshot of
//! the head and turns every write into a single commit, so readers never
//! observe a half-applied change.
//!
//! Domains are ranked by priority ([`DomainPriorityIndex`]); when several
//! domains define the same relative name, the enabled domain with the
//! highest priority wins.

pub mod cache;
pub mod datastore;
pub mod error;
pub mod filter;
pub mod paths;
pub mod priority;
pub mod record;
pub mod syntax;

pub use cache::ChildCache;
pub use datastore::{Child, Datastore};
pub use error::{DatastoreError, DatastoreResult};
pub use filter::NameFilter;
pub use paths::{classify_path, fqname_to_path, path_to_fqname, PathResolver};
pub use priority::DomainPriorityIndex;
pub use record::Record;
pub use syntax::{validate_method_syntax, SyntaxIssue, SyntaxValidator};
