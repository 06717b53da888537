use aetree_types::identifier;

use crate::attrs::{take_string, Attributes};
use crate::envelope::{Envelope, ObjectType};
use crate::error::{ModelError, ModelResult};

/// Separator between the segments of a fully-qualified name.
pub const FQNAME_SEPARATOR: char = '/';

/// A typed record that is stored as one envelope document.
///
/// Records know their own name and the fully-qualified name of their
/// container; where the document lives in the tree is the datastore's
/// business.
pub trait Entity: Sized {
    const OBJECT_TYPE: ObjectType;

    fn name(&self) -> &str;

    /// Fully-qualified name of the container, empty for a domain.
    fn parent(&self) -> &str;

    fn fqname(&self) -> String {
        join_fqname(self.parent(), self.name())
    }

    /// External identifier derived from the fully-qualified name.
    fn id(&self) -> String {
        identifier::encode(&self.fqname())
    }

    fn to_envelope(&self) -> Envelope;

    /// Build a record from a document found under `parent`.
    fn from_envelope(parent: &str, envelope: Envelope) -> ModelResult<Self>;

    fn to_document(&self) -> ModelResult<String> {
        self.to_envelope().to_yaml()
    }

    fn from_document(parent: &str, document: &[u8]) -> ModelResult<Self> {
        Self::from_envelope(parent, Envelope::from_yaml(document)?)
    }
}

pub fn join_fqname(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}{FQNAME_SEPARATOR}{name}")
    }
}

/// Check an entity name: ASCII letters, digits, `_`, `.`, `-` and `$`.
pub fn validate_name(name: &str) -> ModelResult<()> {
    if name.is_empty() {
        return Err(ModelError::InvalidName {
            name: name.to_string(),
            reason: "empty".into(),
        });
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '$')))
    {
        return Err(ModelError::InvalidName {
            name: name.to_string(),
            reason: format!("character {c:?} is not allowed"),
        });
    }
    Ok(())
}

pub(crate) fn expect_type(envelope: &Envelope, expected: ObjectType) -> ModelResult<()> {
    if envelope.object_type == expected {
        Ok(())
    } else {
        Err(ModelError::malformed(format!(
            "expected a {expected} document, found {}",
            envelope.object_type
        )))
    }
}

pub(crate) fn take_name(attrs: &mut Attributes) -> ModelResult<String> {
    let name = take_string(attrs, "name").ok_or_else(|| ModelError::malformed("missing name"))?;
    validate_name(&name).map_err(ModelError::malformed)?;
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        for ok in ["Dom", "ns_1", "a.b-c", "$CLASS$x", "0"] {
            assert!(validate_name(ok).is_ok(), "{ok}");
        }
        for bad in ["", "a b", "a/b", "caf\u{e9}", "x%"] {
            assert!(
                matches!(validate_name(bad), Err(ModelError::InvalidName { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn join() {
        assert_eq!(join_fqname("", "Dom"), "Dom");
        assert_eq!(join_fqname("Dom/ns", "Klass"), "Dom/ns/Klass");
    }
}
