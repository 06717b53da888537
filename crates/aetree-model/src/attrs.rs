use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Flat attribute map of a document, ordered by key.
pub type Attributes = BTreeMap<String, AttrValue>;

/// A scalar attribute value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Str(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Self::Str(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u32> for AttrValue {
    fn from(n: u32) -> Self {
        Self::Int(i64::from(n))
    }
}

// Typed accessors used while turning an attribute map into a record. Each
// removes the key so whatever is left over becomes the record's extras.

pub(crate) fn take_string(attrs: &mut Attributes, key: &str) -> Option<String> {
    match attrs.remove(key)? {
        AttrValue::Null => None,
        AttrValue::Str(s) => Some(s),
        other => Some(other.to_string()),
    }
}

pub(crate) fn take_bool(attrs: &mut Attributes, key: &str) -> ModelResult<Option<bool>> {
    match attrs.remove(key) {
        None | Some(AttrValue::Null) => Ok(None),
        Some(value) => value
            .as_bool()
            .map(Some)
            .ok_or_else(|| ModelError::malformed(format!("{key} must be a boolean"))),
    }
}

pub(crate) fn take_u32(attrs: &mut Attributes, key: &str) -> ModelResult<Option<u32>> {
    match attrs.remove(key) {
        None | Some(AttrValue::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| ModelError::malformed(format!("{key} must be a non-negative integer"))),
    }
}

pub(crate) fn put(attrs: &mut Attributes, key: &str, value: Option<impl Into<AttrValue>>) {
    if let Some(value) = value {
        attrs.insert(key.to_string(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_values_parse_by_shape() {
        let attrs: Attributes =
            serde_yaml::from_str("a: ~\nb: true\nc: 7\nd: 1.5\ne: text\nf: '12'\n").unwrap();
        assert_eq!(attrs["a"], AttrValue::Null);
        assert_eq!(attrs["b"], AttrValue::Bool(true));
        assert_eq!(attrs["c"], AttrValue::Int(7));
        assert_eq!(attrs["d"], AttrValue::Float(1.5));
        assert_eq!(attrs["e"], AttrValue::from("text"));
        assert_eq!(attrs["f"], AttrValue::from("12"));
    }

    #[test]
    fn take_helpers_coerce_and_remove() {
        let mut attrs = Attributes::new();
        attrs.insert("priority".into(), AttrValue::from("3"));
        attrs.insert("system".into(), AttrValue::from("TRUE"));
        attrs.insert("count".into(), AttrValue::Int(4));

        assert_eq!(take_u32(&mut attrs, "priority").unwrap(), Some(3));
        assert_eq!(take_bool(&mut attrs, "system").unwrap(), Some(true));
        assert_eq!(take_string(&mut attrs, "count"), Some("4".to_string()));
        assert!(attrs.is_empty());
        assert_eq!(take_u32(&mut attrs, "priority").unwrap(), None);
    }

    #[test]
    fn take_rejects_wrong_shapes() {
        let mut attrs = Attributes::new();
        attrs.insert("priority".into(), AttrValue::Int(-1));
        attrs.insert("enabled".into(), AttrValue::Int(1));
        assert!(matches!(
            take_u32(&mut attrs, "priority"),
            Err(ModelError::MalformedDocument(_))
        ));
        assert!(take_bool(&mut attrs, "enabled").is_err());
    }

    #[test]
    fn display_is_plain() {
        assert_eq!(AttrValue::Null.to_string(), "");
        assert_eq!(AttrValue::from(5u32).to_string(), "5");
        assert_eq!(AttrValue::from("x").to_string(), "x");
    }
}
