//! Merge engine for aetree.
//!
//! Used when a commit is landed on a head that moved after the commit's
//! parent was captured. [`merge_flat`] decides per path; a conflicting
//! result is rejected as a whole and described by a [`ConflictReport`].

pub mod conflict;
pub mod error;
pub mod three_way;

pub use conflict::{ChangeStatus, ConflictEntry, ConflictReport};
pub use error::{MergeError, MergeResult};
pub use three_way::{merge_flat, MergeOutcome};
