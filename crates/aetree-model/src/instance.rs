use crate::attrs::{put, take_string, AttrValue, Attributes};
use crate::class::AeClass;
use crate::entity::{expect_type, take_name, validate_name, Entity};
use crate::envelope::{Envelope, ObjectType, SubObject};
use crate::error::{ModelError, ModelResult};

/// The value an instance gives one of its class's fields.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldValue {
    pub name: String,
    pub value: Option<String>,
    /// Per-value settings such as `on_entry` or `collect`.
    pub extra: Attributes,
}

impl FieldValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            extra: Attributes::new(),
        }
    }

    fn to_sub_object(&self) -> SubObject {
        let mut attrs = self.extra.clone();
        put(&mut attrs, "value", self.value.clone());
        SubObject::new(self.name.clone(), attrs)
    }

    fn from_sub_object(sub: SubObject) -> ModelResult<Self> {
        validate_name(&sub.key).map_err(ModelError::malformed)?;
        let mut attrs = sub.attributes;
        Ok(Self {
            name: sub.key,
            value: take_string(&mut attrs, "value"),
            extra: attrs,
        })
    }
}

/// A leaf object under a class, holding one value per field.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub parent: String,
    pub name: String,
    pub description: Option<String>,
    pub display_name: Option<String>,
    pub fields: Vec<FieldValue>,
    pub extra: Attributes,
}

impl Instance {
    pub fn new(parent: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            name: name.into(),
            description: None,
            display_name: None,
            fields: Vec::new(),
            extra: Attributes::new(),
        }
    }

    /// Value entry for a field, ignoring case.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Like [`Instance::field`], but a missing entry is an error.
    pub fn field_value(&self, name: &str) -> ModelResult<&FieldValue> {
        self.field(name).ok_or_else(|| ModelError::InvalidFieldReference {
            field: name.to_string(),
            owner: format!("instance {}", self.fqname()),
        })
    }

    /// Set a field's value. The field must be declared by `class`; the entry
    /// takes the declared spelling of the name.
    pub fn set_field_value(
        &mut self,
        class: &AeClass,
        name: &str,
        value: impl Into<String>,
    ) -> ModelResult<()> {
        let declared = class.field(name)?.name.clone();
        let value = Some(value.into());
        match self
            .fields
            .iter_mut()
            .find(|f| f.name.eq_ignore_ascii_case(name))
        {
            Some(entry) => {
                entry.name = declared;
                entry.value = value;
            }
            None => self.fields.push(FieldValue {
                name: declared,
                value,
                extra: Attributes::new(),
            }),
        }
        Ok(())
    }

    /// Names of the fields that carry a value, lowercased.
    pub fn field_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| f.name.to_ascii_lowercase())
            .collect()
    }

    /// Every schema field of `class` with this instance's value, falling back
    /// to the field's default.
    pub fn field_attributes(&self, class: &AeClass) -> Attributes {
        class
            .schema
            .iter()
            .map(|declared| {
                let value = self
                    .field(&declared.name)
                    .and_then(|f| f.value.clone())
                    .or_else(|| declared.default_value.clone())
                    .map_or(AttrValue::Null, AttrValue::Str);
                (declared.name.clone(), value)
            })
            .collect()
    }

    /// Field entries in the class's evaluation order. Entries for fields
    /// the class no longer declares are dropped.
    pub fn fields_sorted(&self, class: &AeClass) -> Vec<&FieldValue> {
        class
            .fields_by_priority()
            .into_iter()
            .filter_map(|declared| self.field(&declared.name))
            .collect()
    }
}

impl Entity for Instance {
    const OBJECT_TYPE: ObjectType = ObjectType::Instance;

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
        Envelope::new(ObjectType::Instance, attrs)
            .with_sub_objects(self.fields.iter().map(FieldValue::to_sub_object).collect())
    }

    fn from_envelope(parent: &str, envelope: Envelope) -> ModelResult<Self> {
        expect_type(&envelope, ObjectType::Instance)?;
        let mut attrs = envelope.attributes;
        Ok(Self {
            parent: parent.to_string(),
            name: take_name(&mut attrs)?,
            description: take_string(&mut attrs, "description"),
            display_name: take_string(&mut attrs, "display_name"),
            fields: envelope
                .sub_objects
                .into_iter()
                .map(FieldValue::from_sub_object)
                .collect::<ModelResult<_>>()?,
            extra: attrs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Field;

    fn class() -> AeClass {
        let mut first = Field::new("Execute");
        first.priority = Some(1);
        AeClass::new("Acme/Infra", "Provision")
            .with_field(Field::new("vm_name").with_default("vm-001"))
            .with_field(first)
    }

    #[test]
    fn set_and_read_fields() {
        let klass = class();
        let mut inst = Instance::new(klass.fqname(), "small");
        inst.set_field_value(&klass, "VM_NAME", "web-1").unwrap();
        inst.set_field_value(&klass, "execute", "provision").unwrap();
        inst.set_field_value(&klass, "vm_name", "web-2").unwrap();

        assert_eq!(inst.fields.len(), 2);
        assert_eq!(inst.field_value("Vm_Name").unwrap().value.as_deref(), Some("web-2"));
        assert_eq!(inst.field_names(), ["vm_name", "execute"]);
        assert_eq!(inst.fields[1].name, "Execute");
    }

    #[test]
    fn undeclared_fields_are_rejected() {
        let klass = class();
        let mut inst = Instance::new(klass.fqname(), "small");
        let err = inst.set_field_value(&klass, "memory", "2G").unwrap_err();
        assert!(matches!(err, ModelError::InvalidFieldReference { .. }));
        assert!(matches!(
            inst.field_value("memory"),
            Err(ModelError::InvalidFieldReference { .. })
        ));
    }

    #[test]
    fn defaults_fill_field_attributes() {
        let klass = class();
        let mut inst = Instance::new(klass.fqname(), "small");
        inst.set_field_value(&klass, "execute", "go").unwrap();
        let attrs = inst.field_attributes(&klass);
        assert_eq!(attrs["vm_name"], AttrValue::from("vm-001"));
        assert_eq!(attrs["Execute"], AttrValue::from("go"));

        let sorted: Vec<&str> = inst
            .fields_sorted(&klass)
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(sorted, ["Execute"]);
    }

    #[test]
    fn fields_keep_document_order() {
        let mut inst = Instance::new("Acme/Infra/Provision", "small");
        inst.fields.push(FieldValue::new("zeta", "1"));
        let mut alpha = FieldValue::new("alpha", "2");
        alpha.extra.insert("on_entry".into(), AttrValue::from("log"));
        inst.fields.push(alpha);

        let doc = inst.to_document().unwrap();
        assert!(doc.find("zeta").unwrap() < doc.find("alpha").unwrap());
        let back = Instance::from_document("Acme/Infra/Provision", doc.as_bytes()).unwrap();
        assert_eq!(back, inst);
        assert_eq!(back.fqname(), "Acme/Infra/Provision/small");
    }
}
