use std::fmt;
use std::str::FromStr;

use crate::attrs::{put, take_string, Attributes};
use crate::class::{find_field, Field};
use crate::entity::{expect_type, join_fqname, take_name, Entity};
use crate::envelope::{Envelope, ObjectType};
use crate::error::{ModelError, ModelResult};

/// Name prefix that marks a class-scope method in a fully-qualified name.
pub const CLASS_SCOPE_PREFIX: &str = "$CLASS$";

macro_rules! attr_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> ModelResult<Self> {
                $(if s.eq_ignore_ascii_case($text) {
                    return Ok(Self::$variant);
                })+
                Err(ModelError::malformed(format!(
                    concat!("unknown ", stringify!($name), " {:?}"),
                    s
                )))
            }
        }
    };
}

attr_enum!(
    /// Script language of a method.
    Language { Ruby => "ruby", Perl => "perl" }
);

attr_enum!(
    /// Where a method's code lives.
    Location { Builtin => "builtin", Inline => "inline", Uri => "uri" }
);

attr_enum!(
    Scope { Class => "class", Instance => "instance" }
);

impl Language {
    /// Extension of the script file kept next to an inline method.
    pub fn script_extension(self) -> &'static str {
        match self {
            Self::Ruby => "rb",
            Self::Perl => "pl",
        }
    }
}

fn take_enum<T: FromStr<Err = ModelError>>(
    attrs: &mut Attributes,
    key: &str,
    default: T,
) -> ModelResult<T> {
    match take_string(attrs, key) {
        Some(text) => text.parse(),
        None => Ok(default),
    }
}

/// A method under a class. Inline methods keep their script body in a
/// sibling file; the body is never part of the document.
#[derive(Clone, Debug, PartialEq)]
pub struct Method {
    pub parent: String,
    pub name: String,
    pub description: Option<String>,
    pub display_name: Option<String>,
    pub language: Language,
    pub location: Location,
    pub scope: Scope,
    /// Script body of an inline method.
    pub data: Option<String>,
    pub inputs: Vec<Field>,
    pub extra: Attributes,
}

impl Method {
    /// A new instance-scope inline ruby method.
    pub fn new(parent: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            name: name.into(),
            description: None,
            display_name: None,
            language: Language::Ruby,
            location: Location::Inline,
            scope: Scope::Instance,
            data: None,
            inputs: Vec::new(),
            extra: Attributes::new(),
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_input(mut self, input: Field) -> Self {
        self.inputs.push(input);
        self
    }

    /// Declared input by name, ignoring case.
    pub fn input(&self, name: &str) -> ModelResult<&Field> {
        find_field(&self.inputs, name).ok_or_else(|| ModelError::InvalidFieldReference {
            field: name.to_string(),
            owner: format!("method {}", self.fqname()),
        })
    }

    /// File name of the sibling script, for inline methods only.
    pub fn script_file_name(&self) -> Option<String> {
        (self.location == Location::Inline)
            .then(|| format!("{}.{}", self.name, self.language.script_extension()))
    }

    /// Script file content: the body with a trailing newline. `None` when
    /// there is nothing to write.
    pub fn script_contents(&self) -> Option<String> {
        self.script_file_name()?;
        let data = self.data.as_deref().filter(|d| !d.is_empty())?;
        if data.ends_with('\n') {
            Some(data.to_string())
        } else {
            Some(format!("{data}\n"))
        }
    }
}

impl Entity for Method {
    const OBJECT_TYPE: ObjectType = ObjectType::Method;

    fn name(&self) -> &str {
        &self.name
    }

    fn parent(&self) -> &str {
        &self.parent
    }

    fn fqname(&self) -> String {
        match self.scope {
            Scope::Class => {
                join_fqname(&self.parent, &format!("{CLASS_SCOPE_PREFIX}{}", self.name))
            }
            Scope::Instance => join_fqname(&self.parent, &self.name),
        }
    }

    fn to_envelope(&self) -> Envelope {
        let mut attrs = self.extra.clone();
        attrs.insert("name".into(), self.name.as_str().into());
        put(&mut attrs, "description", self.description.clone());
        put(&mut attrs, "display_name", self.display_name.clone());
        attrs.insert("language".into(), self.language.as_str().into());
        attrs.insert("location".into(), self.location.as_str().into());
        attrs.insert("scope".into(), self.scope.as_str().into());
        Envelope::new(ObjectType::Method, attrs)
            .with_sub_objects(self.inputs.iter().map(Field::to_sub_object).collect())
    }

    fn from_envelope(parent: &str, envelope: Envelope) -> ModelResult<Self> {
        expect_type(&envelope, ObjectType::Method)?;
        let mut attrs = envelope.attributes;
        // The body travels in a separate file; a stray copy in the document
        // is ignored.
        attrs.remove("data");
        Ok(Self {
            parent: parent.to_string(),
            name: take_name(&mut attrs)?,
            description: take_string(&mut attrs, "description"),
            display_name: take_string(&mut attrs, "display_name"),
            language: take_enum(&mut attrs, "language", Language::Ruby)?,
            location: take_enum(&mut attrs, "location", Location::Inline)?,
            scope: take_enum(&mut attrs, "scope", Scope::Instance)?,
            data: None,
            inputs: envelope
                .sub_objects
                .into_iter()
                .map(Field::from_sub_object)
                .collect::<ModelResult<_>>()?,
            extra: attrs,
        })
    }
}
