use crate::attrs::{put, take_bool, take_string, take_u32, Attributes};
use crate::entity::{expect_type, take_name, Entity};
use crate::envelope::{Envelope, ObjectType};
use crate::error::{ModelError, ModelResult};

/// A root-level namespace scope, ranked against other domains by priority.
#[derive(Clone, Debug, PartialEq)]
pub struct Domain {
    pub name: String,
    pub description: Option<String>,
    pub display_name: Option<String>,
    /// `None` until the domain is first saved, when it is assigned the next
    /// free priority. `Some(0)` means unranked.
    pub priority: Option<u32>,
    /// System domains are protected from edits.
    pub system: bool,
    pub enabled: bool,
    pub extra: Attributes,
}

impl Domain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            display_name: None,
            priority: None,
            system: false,
            enabled: true,
            extra: Attributes::new(),
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn priority(&self) -> u32 {
        self.priority.unwrap_or(0)
    }

    pub fn editable(&self) -> bool {
        !self.system
    }
}

impl Entity for Domain {
    const OBJECT_TYPE: ObjectType = ObjectType::Domain;

    fn name(&self) -> &str {
        &self.name
    }

    fn parent(&self) -> &str {
        ""
    }

    fn to_envelope(&self) -> Envelope {
        let mut attrs = self.extra.clone();
        attrs.insert("name".into(), self.name.as_str().into());
        put(&mut attrs, "description", self.description.clone());
        put(&mut attrs, "display_name", self.display_name.clone());
        put(&mut attrs, "priority", self.priority);
        attrs.insert("system".into(), self.system.into());
        attrs.insert("enabled".into(), self.enabled.into());
        Envelope::new(ObjectType::Domain, attrs)
    }

    fn from_envelope(parent: &str, envelope: Envelope) -> ModelResult<Self> {
        expect_type(&envelope, ObjectType::Domain)?;
        if !parent.is_empty() {
            return Err(ModelError::malformed("a domain cannot be nested"));
        }
        let mut attrs = envelope.attributes;
        Ok(Self {
            name: take_name(&mut attrs)?,
            description: take_string(&mut attrs, "description"),
            display_name: take_string(&mut attrs, "display_name"),
            priority: take_u32(&mut attrs, "priority")?,
            system: take_bool(&mut attrs, "system")?.unwrap_or(false),
            // A document written without the flag was never enabled.
            enabled: take_bool(&mut attrs, "enabled")?.unwrap_or(false),
            extra: attrs,
        })
    }
}

/// A directory of classes and further namespaces inside a domain.
#[derive(Clone, Debug, PartialEq)]
pub struct Namespace {
    pub parent: String,
    pub name: String,
    pub description: Option<String>,
    pub display_name: Option<String>,
    pub system: bool,
    pub extra: Attributes,
}

impl Namespace {
    pub fn new(parent: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            name: name.into(),
            description: None,
            display_name: None,
            system: false,
            extra: Attributes::new(),
        }
    }

    /// Name of the owning domain.
    pub fn domain_name(&self) -> &str {
        self.parent.split('/').next().unwrap_or(&self.parent)
    }
}

impl Entity for Namespace {
    const OBJECT_TYPE: ObjectType = ObjectType::Namespace;

    fn name(&self) -> &str {
        &self.name
    }

    fn parent(&self) -> &str {
        &self.parent
    }

    fn to_envelope(&self) -> Envelope {
        let mut attrs = self.extra.clone();
        attrs.insert("name".into(), self.name.as_str().into());
        put(&mut attrs, "description", self.description.clone());
        put(&mut attrs, "display_name", self.display_name.clone());
        if self.system {
            attrs.insert("system".into(), true.into());
        }
        Envelope::new(ObjectType::Namespace, attrs)
    }

    fn from_envelope(parent: &str, envelope: Envelope) -> ModelResult<Self> {
        expect_type(&envelope, ObjectType::Namespace)?;
        if parent.is_empty() {
            return Err(ModelError::malformed("a namespace needs a parent"));
        }
        let mut attrs = envelope.attributes;
        Ok(Self {
            parent: parent.to_string(),
            name: take_name(&mut attrs)?,
            description: take_string(&mut attrs, "description"),
            display_name: take_string(&mut attrs, "display_name"),
            system: take_bool(&mut attrs, "system")?.unwrap_or(false),
            extra: attrs,
        })
    }
}
