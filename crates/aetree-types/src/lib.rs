//! Foundation types for aetree.
//!
//! Every other aetree crate depends on `aetree-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (BLAKE3 hash)
//! - [`Signature`] -- Author and timestamp recorded on every commit
//! - [`identifier`] -- Reversible escaping between FQNs and external ids

pub mod error;
pub mod identifier;
pub mod object;
pub mod signature;

pub use error::TypeError;
pub use object::ObjectId;
pub use signature::Signature;
