//! Runtime shape validation for [cogwork] components.
//!
//! A [Schema](schema::Schema) declares the expected field shape of a component. The
//! [SchemaHook](hook::SchemaHook) checks each component's
//! [field snapshot](cogwork::component::Component::fields) against its declared schema
//! immediately before and after every lifecycle transition, rejecting the transition
//! with a structured diff of missing, extra and mismatched fields. Components stay
//! oblivious to validation; the coupling lives entirely in the hook.

pub mod hook;
pub mod schema;

pub use hook::SchemaHook;
pub use schema::{FieldMismatch, FieldType, Schema, SchemaError, ShapeDiff};
