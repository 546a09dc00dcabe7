//! Field rule and violation types.

use serde::{Deserialize, Serialize};

/// A closed-world schema: an ordered list of field rules. Keys not listed
/// here are rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub name: &'static str,
    pub fields: Vec<FieldRule>,
}

/// One declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub name: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

/// What a field accepts and how it is normalized.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Sanitized unicode text. `min_length` counts characters after sanitizing.
    Text { min_length: Option<usize> },
    /// Integer, also accepted as a decimal string.
    Integer,
    /// E-mail address.
    Email,
    /// Calendar date in `YYYY-MM-DD` form.
    Date,
    /// Persistent identifier; integers are normalized to strings.
    PersistentIdentifier,
    /// Homogeneous list.
    List(Box<FieldKind>),
    /// Nested object with its own strict schema.
    Nested(Schema),
}

impl Schema {
    pub fn new(name: &'static str, fields: Vec<FieldRule>) -> Self {
        Self { name, fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl FieldRule {
    pub fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            required: true,
            kind,
        }
    }

    pub fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            required: false,
            kind,
        }
    }
}

impl FieldKind {
    pub fn text() -> Self {
        FieldKind::Text { min_length: None }
    }

    pub fn text_min(min_length: usize) -> Self {
        FieldKind::Text {
            min_length: Some(min_length),
        }
    }

    pub fn list_of(kind: FieldKind) -> Self {
        FieldKind::List(Box::new(kind))
    }
}

/// A single field-level violation. `field` is a dotted path such as
/// `contributors.0.email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
