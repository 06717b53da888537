//! Line-level diff for aetree.
//!
//! [`diff_blobs`] compares two file contents and yields the changed lines
//! as [`DiffLine`]s; conflict reports render them as `+ ` / `- ` markers.

pub mod blob_diff;

pub use blob_diff::{diff_blobs, BlobDiff, DiffLine};
