//! Hooks observing lifecycle transitions. A [TransitionHook] runs immediately before
//! and after every component start/stop driven by a [System](crate::system::System)
//! and can veto the transition by returning an error. Shape validation is layered on
//! top of the lifecycle through this seam, keeping components free of validation code.

use crate::component::Component;
use crate::error::ErrorPtr;
#[cfg(test)]
use mockall::automock;
use std::fmt::{Display, Formatter};

/// Owned pointer to a type-erased transition hook.
pub type TransitionHookPtr = Box<dyn TransitionHook>;

/// A lifecycle transition driven by the system.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Transition {
    Start,
    Stop,
}

impl Display for Transition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Start => write!(f, "start"),
            Transition::Stop => write!(f, "stop"),
        }
    }
}

/// Whether a hook is running before or after the transition itself.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HookPhase {
    Before,
    After,
}

impl Display for HookPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HookPhase::Before => write!(f, "before"),
            HookPhase::After => write!(f, "after"),
        }
    }
}

/// Observes component lifecycle transitions. Returning an error aborts the transition;
/// the system surfaces it as [LifecycleError::HookRejected](crate::error::LifecycleError).
#[cfg_attr(test, automock)]
pub trait TransitionHook {
    fn on_transition(
        &self,
        name: &str,
        component: &dyn Component,
        transition: Transition,
        phase: HookPhase,
    ) -> Result<(), ErrorPtr>;
}
