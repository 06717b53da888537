//! Reference management for aetree.
//!
//! Two references matter: [`HEAD_REF`], the tip of the single tracked
//! branch, and [`LOCK_REF`], created exclusively by whichever writer is
//! currently advancing the head. Everything else about history lives in the
//! object store.
//!
//! # Modules
//!
//! - [`types`] -- [`Ref`] values and the well-known names
//! - [`traits`] -- the [`RefStore`] storage interface
//! - [`names`] -- ref name validation
//! - [`memory`] / [`fs`] -- backends

pub mod error;
pub mod fs;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, Result};
pub use fs::FsRefStore;
pub use memory::InMemoryRefStore;
pub use names::validate_ref_name;
pub use traits::RefStore;
pub use types::{Ref, HEAD_REF, LOCK_REF};
