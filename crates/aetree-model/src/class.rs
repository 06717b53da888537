use crate::attrs::{put, take_string, take_u32, Attributes};
use crate::entity::{expect_type, take_name, Entity};
use crate::envelope::{Envelope, ObjectType, SubObject};
use crate::error::{ModelError, ModelResult};

/// Key every declared field is wrapped in inside a schema or input list.
pub const FIELD_KEY: &str = "field";

/// A declared field: an entry of a class schema or a method's inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    /// Role of the field in a class schema (`attribute`, `method`, `state`...).
    pub aetype: Option<String>,
    pub datatype: Option<String>,
    pub default_value: Option<String>,
    pub priority: Option<u32>,
    pub extra: Attributes,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aetype: None,
            datatype: None,
            default_value: None,
            priority: None,
            extra: Attributes::new(),
        }
    }

    pub fn with_datatype(mut self, datatype: impl Into<String>) -> Self {
        self.datatype = Some(datatype.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub(crate) fn to_sub_object(&self) -> SubObject {
        let mut attrs = self.extra.clone();
        attrs.insert("name".into(), self.name.as_str().into());
        put(&mut attrs, "aetype", self.aetype.clone());
        put(&mut attrs, "datatype", self.datatype.clone());
        put(&mut attrs, "default_value", self.default_value.clone());
        put(&mut attrs, "priority", self.priority);
        SubObject::new(FIELD_KEY, attrs)
    }

    pub(crate) fn from_sub_object(sub: SubObject) -> ModelResult<Self> {
        if sub.key != FIELD_KEY {
            return Err(ModelError::malformed(format!(
                "expected a {FIELD_KEY} entry, found {:?}",
                sub.key
            )));
        }
        let mut attrs = sub.attributes;
        Ok(Self {
            name: take_name(&mut attrs)?,
            aetype: take_string(&mut attrs, "aetype"),
            datatype: take_string(&mut attrs, "datatype"),
            default_value: take_string(&mut attrs, "default_value"),
            priority: take_u32(&mut attrs, "priority")?,
            extra: attrs,
        })
    }
}

/// Case-insensitive lookup in a declared field list.
pub(crate) fn find_field<'a>(fields: &'a [Field], name: &str) -> Option<&'a Field> {
    fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
}

/// A class: a schema of declared fields plus the instances and methods
/// stored beneath it.
#[derive(Clone, Debug, PartialEq)]
pub struct AeClass {
    pub parent: String,
    pub name: String,
    pub description: Option<String>,
    pub display_name: Option<String>,
    /// Fully-qualified name of the class this one extends.
    pub inherits: Option<String>,
    pub schema: Vec<Field>,
    pub extra: Attributes,
}

impl AeClass {
    pub fn new(parent: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            name: name.into(),
            description: None,
            display_name: None,
            inherits: None,
            schema: Vec::new(),
            extra: Attributes::new(),
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.schema.push(field);
        self
    }

    /// Declared field by name, ignoring case.
    pub fn field(&self, name: &str) -> ModelResult<&Field> {
        find_field(&self.schema, name).ok_or_else(|| ModelError::InvalidFieldReference {
            field: name.to_string(),
            owner: format!("class {}", self.fqname()),
        })
    }

    /// Schema fields in evaluation order: by priority, unranked last, ties
    /// kept in declaration order.
    pub fn fields_by_priority(&self) -> Vec<&Field> {
        let mut fields: Vec<&Field> = self.schema.iter().collect();
        fields.sort_by_key(|f| f.priority.unwrap_or(u32::MAX));
        fields
    }
}

impl Entity for AeClass {
    const OBJECT_TYPE: ObjectType = ObjectType::Class;

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
        put(&mut attrs, "inherits", self.inherits.clone());
        Envelope::new(ObjectType::Class, attrs)
            .with_sub_objects(self.schema.iter().map(Field::to_sub_object).collect())
    }

    fn from_envelope(parent: &str, envelope: Envelope) -> ModelResult<Self> {
        expect_type(&envelope, ObjectType::Class)?;
        let mut attrs = envelope.attributes;
        Ok(Self {
            parent: parent.to_string(),
            name: take_name(&mut attrs)?,
            description: take_string(&mut attrs, "description"),
            display_name: take_string(&mut attrs, "display_name"),
            inherits: take_string(&mut attrs, "inherits"),
            schema: envelope
                .sub_objects
                .into_iter()
                .map(Field::from_sub_object)
                .collect::<ModelResult<_>>()?,
            extra: attrs,
        })
    }
}
