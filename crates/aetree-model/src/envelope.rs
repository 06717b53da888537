//! The canonical document layout every entity is stored as.
//!
//! ```yaml
//! object_type: method
//! version: '1.0'
//! object:
//!   attributes:
//!     name: provision
//!     language: ruby
//!   inputs:
//!   - field:
//!       name: vm_name
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::attrs::{AttrValue, Attributes};
use crate::error::{ModelError, ModelResult};

/// Format version written into every document.
pub const FORMAT_VERSION: &str = "1.0";

/// Versions a document may carry and still be read.
pub const SUPPORTED_VERSIONS: &[&str] = &[FORMAT_VERSION];

/// Internal linkage keys that never reach a document.
pub const EXPORT_EXCLUDED_KEYS: &[&str] = &[
    "id",
    "namespace_id",
    "parent_id",
    "class_id",
    "method_id",
    "created_on",
    "updated_on",
    "updated_by_skip",
    "reserved",
    "data",
    "field_id",
    "instance_id",
];

/// Type tag of a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Domain,
    Namespace,
    Class,
    Instance,
    Method,
}

impl ObjectType {
    pub const ALL: [ObjectType; 5] = [
        Self::Domain,
        Self::Namespace,
        Self::Class,
        Self::Instance,
        Self::Method,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Namespace => "namespace",
            Self::Class => "class",
            Self::Instance => "instance",
            Self::Method => "method",
        }
    }

    /// Name of the ordered sub-object list this type carries, if any.
    pub fn sub_object_key(self) -> Option<&'static str> {
        match self {
            Self::Class => Some("schema"),
            Self::Instance => Some("fields"),
            Self::Method => Some("inputs"),
            Self::Domain | Self::Namespace => None,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::malformed(format!("unknown object type {s:?}")))
    }
}

/// One entry of an ordered sub-object list: a single key mapping to an
/// attribute map, e.g. `{field: {name: vm_name}}` or `{vm_name: {value: x}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Attributes>",
    into = "BTreeMap<String, Attributes>"
)]
pub struct SubObject {
    pub key: String,
    pub attributes: Attributes,
}

impl SubObject {
    pub fn new(key: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            key: key.into(),
            attributes,
        }
    }
}

impl TryFrom<BTreeMap<String, Attributes>> for SubObject {
    type Error = String;

    fn try_from(map: BTreeMap<String, Attributes>) -> Result<Self, String> {
        if map.len() != 1 {
            return Err(format!("sub-object must have exactly one key, found {}", map.len()));
        }
        let (key, attributes) = map.into_iter().next().ok_or("empty sub-object")?;
        Ok(Self { key, attributes })
    }
}

impl From<SubObject> for BTreeMap<String, Attributes> {
    fn from(sub: SubObject) -> Self {
        BTreeMap::from([(sub.key, sub.attributes)])
    }
}

/// A decoded document.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    pub object_type: ObjectType,
    pub version: String,
    pub attributes: Attributes,
    pub sub_objects: Vec<SubObject>,
}

impl Envelope {
    pub fn new(object_type: ObjectType, attributes: Attributes) -> Self {
        Self {
            object_type,
            version: FORMAT_VERSION.to_string(),
            attributes,
            sub_objects: Vec::new(),
        }
    }

    pub fn with_sub_objects(mut self, sub_objects: Vec<SubObject>) -> Self {
        self.sub_objects = sub_objects;
        self
    }

    pub fn to_yaml(&self) -> ModelResult<String> {
        serialize(
            self.object_type,
            &self.version,
            &self.attributes,
            &self.sub_objects,
        )
    }

    pub fn from_yaml(document: &[u8]) -> ModelResult<Self> {
        deserialize(document)
    }
}

#[derive(Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    object_type: Option<String>,
    #[serde(default)]
    version: Option<AttrValue>,
    #[serde(default)]
    object: Option<Body>,
}

#[derive(Default, Serialize, Deserialize)]
struct Body {
    #[serde(default)]
    attributes: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema: Option<Vec<SubObject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<SubObject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inputs: Option<Vec<SubObject>>,
}

impl Body {
    fn slot(&mut self, key: &str) -> Option<&mut Option<Vec<SubObject>>> {
        match key {
            "schema" => Some(&mut self.schema),
            "fields" => Some(&mut self.fields),
            "inputs" => Some(&mut self.inputs),
            _ => None,
        }
    }
}

/// Drop internal linkage keys from an attribute map.
pub fn export_attributes(attributes: &Attributes) -> Attributes {
    attributes
        .iter()
        .filter(|(key, _)| !EXPORT_EXCLUDED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn check_version(version: &str) -> ModelResult<()> {
    if SUPPORTED_VERSIONS.contains(&version) {
        Ok(())
    } else {
        Err(ModelError::malformed(format!("unsupported version {version:?}")))
    }
}

/// Build a document. Excluded linkage keys are dropped from the attributes
/// and from every sub-object.
pub fn serialize(
    object_type: ObjectType,
    version: &str,
    attributes: &Attributes,
    sub_objects: &[SubObject],
) -> ModelResult<String> {
    check_version(version)?;

    let mut body = Body {
        attributes: Some(export_attributes(attributes)),
        ..Body::default()
    };
    let exported = sub_objects
        .iter()
        .map(|sub| SubObject::new(sub.key.clone(), export_attributes(&sub.attributes)))
        .collect::<Vec<_>>();
    match object_type.sub_object_key().and_then(|key| body.slot(key)) {
        Some(slot) => *slot = Some(exported),
        None if exported.is_empty() => {}
        None => {
            return Err(ModelError::Serialization(format!(
                "{object_type} documents carry no sub-objects"
            )))
        }
    }

    let document = Document {
        object_type: Some(object_type.as_str().to_string()),
        version: Some(AttrValue::from(version)),
        object: Some(body),
    };
    serde_yaml::to_string(&document).map_err(|e| ModelError::Serialization(e.to_string()))
}

/// Read a document back.
///
/// Fails with [`ModelError::MalformedDocument`] when the content is not
/// YAML, or the type tag or version is missing or unknown.
pub fn deserialize(document: &[u8]) -> ModelResult<Envelope> {
    let raw: Document = serde_yaml::from_slice(document).map_err(ModelError::malformed)?;

    let object_type: ObjectType = raw
        .object_type
        .ok_or_else(|| ModelError::malformed("missing object_type"))?
        .parse()?;
    let version = match raw.version {
        Some(AttrValue::Str(v)) => v,
        // An unquoted `version: 1.0` reads back as a float.
        Some(AttrValue::Float(v)) => format!("{v:.1}"),
        Some(other) => other.to_string(),
        None => return Err(ModelError::malformed("missing version")),
    };
    check_version(&version)?;

    let mut body = raw.object.unwrap_or_default();
    let sub_objects = object_type
        .sub_object_key()
        .and_then(|key| body.slot(key))
        .and_then(Option::take)
        .unwrap_or_default();

    Ok(Envelope {
        object_type,
        version,
        attributes: body.attributes.unwrap_or_default(),
        sub_objects,
    })
}
