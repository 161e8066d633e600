//! Lifecycle hook running shape checks around every transition.

use crate::schema::Schema;
use cogwork::component::Component;
use cogwork::error::ErrorPtr;
use cogwork::hooks::{HookPhase, Transition, TransitionHook};
use fxhash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

/// [TransitionHook] validating component shapes against declared [Schema]s before and
/// after each lifecycle transition. Components without a registered schema pass
/// unchecked.
#[derive(Default)]
pub struct SchemaHook {
    schemas: FxHashMap<String, Schema>,
}

impl SchemaHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the declared schema for the component with the given name.
    pub fn schema<T: ToString>(mut self, component_name: T, schema: Schema) -> Self {
        self.schemas.insert(component_name.to_string(), schema);
        self
    }
}

impl TransitionHook for SchemaHook {
    fn on_transition(
        &self,
        name: &str,
        component: &dyn Component,
        transition: Transition,
        phase: HookPhase,
    ) -> Result<(), ErrorPtr> {
        let Some(schema) = self.schemas.get(name) else {
            return Ok(());
        };

        debug!("Validating shape of component '{name}' {phase} {transition}");

        schema
            .check(&component.fields())
            .map_err(|error| Arc::new(error) as ErrorPtr)
    }
}
