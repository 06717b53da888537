//! Typed records for the automation tree and the envelope they are stored in.
//!
//! Every entity (domain, namespace, class, instance, method) is a typed
//! record implementing [`Entity`]. Records convert to and from an
//! [`Envelope`]: a type tag, a format version, a flat attribute map and,
//! for classes, instances and methods, an ordered list of sub-objects.
//! Attributes the record does not know are kept in its `extra` map and
//! written back unchanged.

pub mod attrs;
pub mod class;
pub mod entity;
pub mod envelope;
pub mod error;
pub mod instance;
pub mod method;
pub mod namespace;

pub use attrs::{AttrValue, Attributes};
pub use class::{AeClass, Field};
pub use entity::{join_fqname, validate_name, Entity};
pub use envelope::{
    deserialize, export_attributes, serialize, Envelope, ObjectType, SubObject, FORMAT_VERSION,
};
pub use error::{ModelError, ModelResult};
pub use instance::{FieldValue, Instance};
pub use method::{Language, Location, Method, Scope, CLASS_SCOPE_PREFIX};
pub use namespace::{Domain, Namespace};
