//! Declared component shapes and the shape check itself.

use cogwork::component::{FieldMap, FieldValue};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Expected type of a single component field.
#[derive(Clone, PartialEq, Debug)]
pub enum FieldType {
    Str,
    Int,
    Bool,
    Uri,
    /// An opaque live resource of the given handle kind.
    Handle(&'static str),
    /// A structured record of the given record kind.
    Record(&'static str),
    Map,
    /// Matches the inner type or an absent field. Fields produced at start time are
    /// declared optional so the same schema holds before and after the transition.
    Optional(Box<FieldType>),
}

impl FieldType {
    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional(Box::new(inner))
    }

    pub fn matches(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (FieldType::Optional(_), FieldValue::Absent) => true,
            (FieldType::Optional(inner), value) => inner.matches(value),
            (FieldType::Str, FieldValue::Str(_)) => true,
            (FieldType::Int, FieldValue::Int(_)) => true,
            (FieldType::Bool, FieldValue::Bool(_)) => true,
            (FieldType::Uri, FieldValue::Uri(_)) => true,
            (FieldType::Handle(kind), FieldValue::Handle(actual)) => kind == actual,
            (FieldType::Record(kind), FieldValue::Record(actual)) => kind == actual,
            (FieldType::Map, FieldValue::Map(_)) => true,
            _ => false,
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Str => write!(f, "str"),
            FieldType::Int => write!(f, "int"),
            FieldType::Bool => write!(f, "bool"),
            FieldType::Uri => write!(f, "uri"),
            FieldType::Handle(kind) => write!(f, "handle<{kind}>"),
            FieldType::Record(kind) => write!(f, "record<{kind}>"),
            FieldType::Map => write!(f, "map"),
            FieldType::Optional(inner) => write!(f, "optional({inner})"),
        }
    }
}

/// A single field whose snapshot value does not match its declared type.
#[derive(Clone, PartialEq, Debug)]
pub struct FieldMismatch {
    pub field: String,
    pub expected: FieldType,
    pub actual: FieldValue,
}

/// Structured diff between a declared schema and an actual field snapshot.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct ShapeDiff {
    /// Declared fields absent from the snapshot.
    pub missing: Vec<String>,
    /// Snapshot fields not present in the declaration.
    pub extra: Vec<String>,
    /// Fields present on both sides with incompatible shapes.
    pub mismatched: Vec<FieldMismatch>,
}

impl ShapeDiff {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty() && self.mismatched.is_empty()
    }
}

impl Display for ShapeDiff {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut segments = Vec::with_capacity(3);
        if !self.missing.is_empty() {
            segments.push(format!("missing fields: [{}]", self.missing.iter().join(", ")));
        }
        if !self.extra.is_empty() {
            segments.push(format!("extra fields: [{}]", self.extra.iter().join(", ")));
        }
        if !self.mismatched.is_empty() {
            segments.push(format!(
                "mismatched fields: [{}]",
                self.mismatched
                    .iter()
                    .map(|mismatch| {
                        format!(
                            "{} (expected {}, found {})",
                            mismatch.field, mismatch.expected, mismatch.actual
                        )
                    })
                    .join(", ")
            ));
        }

        write!(f, "{}", segments.join("; "))
    }
}

/// Errors raised by shape checks.
#[derive(Error, Clone, PartialEq, Debug)]
pub enum SchemaError {
    #[error("Component shape does not match its declared schema: {0}")]
    ShapeMismatch(ShapeDiff),
}

/// Declared expected shape of a component: field names mapped to [FieldType]s.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct Schema {
    fields: BTreeMap<String, FieldType>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field with its expected type.
    pub fn field<T: ToString>(mut self, name: T, field_type: FieldType) -> Self {
        self.fields.insert(name.to_string(), field_type);
        self
    }

    /// Checks an actual field snapshot against this schema. Every offending field is
    /// reported; the check does not stop at the first difference.
    pub fn check(&self, actual: &FieldMap) -> Result<(), SchemaError> {
        let mut diff = ShapeDiff::default();

        for (name, expected) in &self.fields {
            match actual.get(name) {
                None => diff.missing.push(name.clone()),
                Some(value) if !expected.matches(value) => diff.mismatched.push(FieldMismatch {
                    field: name.clone(),
                    expected: expected.clone(),
                    actual: value.clone(),
                }),
                Some(_) => {}
            }
        }

        for name in actual.keys() {
            if !self.fields.contains_key(name) {
                diff.extra.push(name.clone());
            }
        }

        if diff.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::ShapeMismatch(diff))
        }
    }
}
