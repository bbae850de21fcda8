//! Typed property values.

#![allow(missing_docs)]

use std::fmt;

use indexmap::IndexMap;
use smol_str::SmolStr;

/// Ordered name to value map used for typed property snapshots.
pub type PropertyMap = IndexMap<SmolStr, PropertyValue>;

/// A personalizable property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    String(SmolStr),
    Enum(EnumValue),
    List(Vec<PropertyValue>),
    Composite(CompositeValue),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub type_name: SmolStr,
    pub variant: SmolStr,
    pub numeric: i64,
}

impl EnumValue {
    #[must_use]
    pub fn new(type_name: impl Into<SmolStr>, variant: impl Into<SmolStr>, numeric: i64) -> Self {
        Self {
            type_name: type_name.into(),
            variant: variant.into(),
            numeric,
        }
    }
}

/// Structured value with named fields, e.g. a size or a colour triple.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeValue {
    pub type_name: SmolStr,
    pub fields: IndexMap<SmolStr, PropertyValue>,
}

impl CompositeValue {
    #[must_use]
    pub fn new(type_name: impl Into<SmolStr>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<SmolStr>, value: impl Into<PropertyValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

impl PropertyValue {
    /// Short kind name used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Enum(_) => "enum",
            Self::List(_) => "list",
            Self::Composite(_) => "composite",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(value) => Some(*value),
            Self::Int(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Long(value) => write!(f, "{value}L"),
            Self::Double(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::Enum(value) => write!(f, "{}.{}", value.type_name, value.variant),
            Self::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Composite(value) => {
                write!(f, "{} {{", value.type_name)?;
                for (idx, (name, field)) in value.fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {name}: {field}")?;
                }
                f.write_str(" }")
            }
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(SmolStr::new(value))
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(SmolStr::new(value))
    }
}

impl From<SmolStr> for PropertyValue {
    fn from(value: SmolStr) -> Self {
        Self::String(value)
    }
}

impl From<EnumValue> for PropertyValue {
    fn from(value: EnumValue) -> Self {
        Self::Enum(value)
    }
}

impl From<CompositeValue> for PropertyValue {
    fn from(value: CompositeValue) -> Self {
        Self::Composite(value)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(value: Vec<PropertyValue>) -> Self {
        Self::List(value)
    }
}
