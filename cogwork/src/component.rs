//! The basic building block of a system is a [Component] - a named unit with a declared
//! set of fields and a start/stop lifecycle. Some fields are supplied at construction,
//! some are injected as dependencies when the system starts, and some are produced by
//! `start` itself (e.g. an open connection handle).
//!
//! Components expose a [FieldMap] snapshot of their current shape, which transition
//! hooks can compare against a declared schema without the component knowing anything
//! about validation.

use crate::error::{DependencyError, ErrorPtr};
use fxhash::FxHashMap;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Owned pointer to a type-erased component.
pub type ComponentPtr = Box<dyn Component>;

/// Runtime shape of a single component field.
#[derive(Clone, PartialEq, Debug)]
pub enum FieldValue {
    /// The field is not populated (e.g. a connection handle before start).
    Absent,
    Str(String),
    Int(i64),
    Bool(bool),
    Uri(String),
    /// An opaque live resource, tagged with a handle kind.
    Handle(&'static str),
    /// A structured record, tagged with a record kind.
    Record(&'static str),
    /// A map-like field, carrying its current entry count.
    Map(usize),
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Absent => write!(f, "absent"),
            FieldValue::Str(value) => write!(f, "str({value:?})"),
            FieldValue::Int(value) => write!(f, "int({value})"),
            FieldValue::Bool(value) => write!(f, "bool({value})"),
            FieldValue::Uri(value) => write!(f, "uri({value:?})"),
            FieldValue::Handle(kind) => write!(f, "handle<{kind}>"),
            FieldValue::Record(kind) => write!(f, "record<{kind}>"),
            FieldValue::Map(len) => write!(f, "map({len} entries)"),
        }
    }
}

/// Snapshot of a component's fields, ordered by field name for stable reporting.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A named unit managed by a [System](crate::system::System).
///
/// Lifecycle: stopped (initial) -> started -> stopped. `start` receives the
/// already-started upstream components declared for it in the system wiring; `stop`
/// releases whatever `start` produced. Errors are type-erased [ErrorPtr]s, which the
/// system wraps with the component name and transition.
pub trait Component: Any {
    /// Starts the component. Dependencies in `deps` are guaranteed to be started.
    fn start(&mut self, deps: &ResolvedDependencies) -> Result<(), ErrorPtr>;

    /// Stops the component, releasing resources produced by `start`.
    fn stop(&mut self) -> Result<(), ErrorPtr>;

    /// Returns a snapshot of the component's current field shape.
    fn fields(&self) -> FieldMap;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// View of a component's wired dependencies, resolved at transition time against the
/// started upstream instances - never against pre-start configuration objects.
pub struct ResolvedDependencies<'a> {
    component: &'a str,
    fields: FxHashMap<&'a str, &'a dyn Component>,
}

impl<'a> ResolvedDependencies<'a> {
    /// Creates an empty dependency view for the named component. Systems build these
    /// internally; constructing one by hand is mostly useful for exercising a
    /// component outside a system.
    pub fn new(component: &'a str) -> Self {
        Self {
            component,
            fields: FxHashMap::default(),
        }
    }

    /// Injects a started component under the given dependency field.
    pub fn insert(&mut self, field: &'a str, dependency: &'a dyn Component) {
        self.fields.insert(field, dependency);
    }

    /// Returns the dependency wired under `field`, downcast to its concrete type.
    pub fn get<T: Component>(&self, field: &str) -> Result<&T, DependencyError> {
        let dependency = self
            .fields
            .get(field)
            .ok_or_else(|| DependencyError::Missing {
                component: self.component.to_string(),
                field: field.to_string(),
            })?;

        dependency
            .as_any()
            .downcast_ref()
            .ok_or_else(|| DependencyError::Incompatible {
                component: self.component.to_string(),
                field: field.to_string(),
            })
    }

    /// Returns the dependency wired under `field` as a type-erased component.
    pub fn get_raw(&self, field: &str) -> Result<&dyn Component, DependencyError> {
        self.fields
            .get(field)
            .copied()
            .ok_or_else(|| DependencyError::Missing {
                component: self.component.to_string(),
                field: field.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
