use crate::hooks::{HookPhase, Transition};
use crate::system::SystemState;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

/// Type-erased error pointer used for heterogeneous component and hook errors.
pub type ErrorPtr = Arc<dyn Error + Send + Sync>;

/// Errors related to assembling a [System](crate::system::System) from component and
/// wiring declarations.
#[derive(Error, Clone, PartialEq, Eq, Debug)]
pub enum SystemBuildError {
    #[error("Attempted to register a duplicated component with name: {0}")]
    DuplicateComponentName(String),
    #[error("Cannot wire dependencies for unknown component: {0}")]
    UnknownComponent(String),
    #[error("Component '{component}' wires dependency field '{field}' to unknown component: {target}")]
    UnknownDependencyTarget {
        component: String,
        field: String,
        target: String,
    },
    #[error("Component '{component}' declares duplicate dependency field: {field}")]
    DuplicateDependencyField { component: String, field: String },
    #[error("Dependency cycle detected involving component: {0}")]
    DependencyCycle(String),
}

/// Errors related to driving a built system through its lifecycle.
#[derive(Error, Clone, Debug)]
pub enum LifecycleError {
    #[error("Cannot {transition} a system in state '{state}'")]
    InvalidTransition {
        transition: Transition,
        state: SystemState,
    },
    #[error("Component '{component}' failed to {transition}: {source}")]
    ComponentFailed {
        component: String,
        transition: Transition,
        source: ErrorPtr,
    },
    #[error("Hook rejected {phase}-{transition} of component '{component}': {source}")]
    HookRejected {
        component: String,
        transition: Transition,
        phase: HookPhase,
        source: ErrorPtr,
    },
    #[error("System refers to unknown component: {0}")]
    UnknownComponent(String),
}

/// Errors raised when a component resolves its injected dependencies.
#[derive(Error, Clone, PartialEq, Eq, Debug)]
pub enum DependencyError {
    #[error("Component '{component}' requested unwired dependency field: {field}")]
    Missing { component: String, field: String },
    #[error("Dependency field '{field}' of component '{component}' holds an incompatible component type")]
    Incompatible { component: String, field: String },
}
