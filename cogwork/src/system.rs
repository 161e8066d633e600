//! Assembling and driving a [System] of named components.
//!
//! A [SystemBuilder] collects components, dependency wiring and transition hooks, then
//! validates the wiring (known names, unique fields, acyclic graph) and produces a
//! [System]. Starting the system transitions every component in topological dependency
//! order, injecting each started upstream component into its dependents; stopping runs
//! the reverse order. The system as a whole is a strictly linear state machine:
//! built -> started -> stopped.

use crate::component::{Component, ComponentPtr, ResolvedDependencies};
use crate::error::{LifecycleError, SystemBuildError};
use crate::hooks::{HookPhase, Transition, TransitionHookPtr};
use fxhash::FxHashMap;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use tracing::{debug, info};

/// Lifecycle state of a whole [System]. Transitions are strictly linear; there is no
/// restart. A failed transition leaves the system in its previous state with an
/// unspecified subset of components transitioned.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SystemState {
    Built,
    Started,
    Stopped,
}

impl Display for SystemState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemState::Built => write!(f, "built"),
            SystemState::Started => write!(f, "started"),
            SystemState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Builder collecting named components, dependency wiring and hooks for a [System].
#[derive(Default)]
pub struct SystemBuilder {
    components: Vec<(String, ComponentPtr)>,
    wiring: Vec<(String, String, String)>,
    hooks: Vec<TransitionHookPtr>,
}

impl SystemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named component.
    pub fn component<T: ToString>(mut self, name: T, component: ComponentPtr) -> Self {
        self.components.push((name.to_string(), component));
        self
    }

    /// Wires dependency field `field` of `component` to the component named `target`.
    /// At start time, the started `target` instance is injected under `field`.
    pub fn depends_on<T: ToString, F: ToString, D: ToString>(
        mut self,
        component: T,
        field: F,
        target: D,
    ) -> Self {
        self.wiring
            .push((component.to_string(), field.to_string(), target.to_string()));
        self
    }

    /// Adds a hook running before and after every component transition.
    pub fn hook(mut self, hook: TransitionHookPtr) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Validates the declared components and wiring and builds the [System].
    pub fn build(self) -> Result<System, SystemBuildError> {
        let mut components: FxHashMap<String, ComponentPtr> = FxHashMap::default();
        for (name, component) in self.components {
            if components.insert(name.clone(), component).is_some() {
                return Err(SystemBuildError::DuplicateComponentName(name));
            }
        }

        let mut dependencies: FxHashMap<String, FxHashMap<String, String>> =
            FxHashMap::default();
        for (component, field, target) in self.wiring {
            if !components.contains_key(&component) {
                return Err(SystemBuildError::UnknownComponent(component));
            }
            if !components.contains_key(&target) {
                return Err(SystemBuildError::UnknownDependencyTarget {
                    component,
                    field,
                    target,
                });
            }

            let wiring = dependencies.entry(component.clone()).or_default();
            if wiring.contains_key(&field) {
                return Err(SystemBuildError::DuplicateDependencyField { component, field });
            }
            wiring.insert(field, target);
        }

        let start_order = topological_order(&components, &dependencies)?;

        Ok(System {
            components,
            dependencies,
            start_order,
            hooks: self.hooks,
            state: SystemState::Built,
        })
    }
}

/// Kahn's algorithm over the dependency graph, with ties broken by component name so
/// the start order is deterministic.
fn topological_order(
    components: &FxHashMap<String, ComponentPtr>,
    dependencies: &FxHashMap<String, FxHashMap<String, String>>,
) -> Result<Vec<String>, SystemBuildError> {
    let mut in_degree: FxHashMap<&str, usize> = components
        .keys()
        .map(|name| (name.as_str(), 0))
        .collect();
    let mut dependents: FxHashMap<&str, Vec<&str>> = FxHashMap::default();

    for (component, wiring) in dependencies {
        for target in wiring.values() {
            *in_degree.entry(component.as_str()).or_default() += 1;
            dependents
                .entry(target.as_str())
                .or_default()
                .push(component.as_str());
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| *name)
        .collect();

    let mut order = Vec::with_capacity(components.len());
    while let Some(name) = ready.iter().next().copied() {
        ready.remove(name);
        order.push(name.to_string());

        for dependent in dependents.remove(name).unwrap_or_default() {
            let degree = in_degree.entry(dependent).or_default();
            *degree -= 1;
            if *degree == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() < components.len() {
        let in_cycle = components
            .keys()
            .filter(|name| !order.contains(*name))
            .sorted()
            .next()
            .cloned()
            .unwrap_or_default();
        return Err(SystemBuildError::DependencyCycle(in_cycle));
    }

    Ok(order)
}

/// A built collection of named components plus their dependency wiring, driven through
/// a shared start/stop lifecycle.
pub struct System {
    components: FxHashMap<String, ComponentPtr>,
    dependencies: FxHashMap<String, FxHashMap<String, String>>,
    start_order: Vec<String>,
    hooks: Vec<TransitionHookPtr>,
    state: SystemState,
}

impl System {
    /// Starts all components in dependency order. Valid only in the built state.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        if self.state != SystemState::Built {
            return Err(LifecycleError::InvalidTransition {
                transition: Transition::Start,
                state: self.state,
            });
        }

        info!("Starting {} components...", self.start_order.len());

        let order = self.start_order.clone();
        for name in &order {
            self.transition(name, Transition::Start)?;
        }

        self.state = SystemState::Started;
        Ok(())
    }

    /// Stops all components in reverse start order. Valid only in the started state.
    pub fn stop(&mut self) -> Result<(), LifecycleError> {
        if self.state != SystemState::Started {
            return Err(LifecycleError::InvalidTransition {
                transition: Transition::Stop,
                state: self.state,
            });
        }

        info!("Stopping {} components...", self.start_order.len());

        let order = self.start_order.clone();
        for name in order.iter().rev() {
            self.transition(name, Transition::Stop)?;
        }

        self.state = SystemState::Stopped;
        Ok(())
    }

    pub fn state(&self) -> SystemState {
        self.state
    }

    /// Component names in start order; stop order is the reverse.
    pub fn start_order(&self) -> &[String] {
        &self.start_order
    }

    /// Returns the named component downcast to its concrete type.
    pub fn component<T: Component>(&self, name: &str) -> Option<&T> {
        self.components
            .get(name)
            .and_then(|component| component.as_any().downcast_ref())
    }

    fn transition(&mut self, name: &str, transition: Transition) -> Result<(), LifecycleError> {
        let Some(mut component) = self.components.remove(name) else {
            return Err(LifecycleError::UnknownComponent(name.to_string()));
        };

        let result = self.run_transition(name, &mut component, transition);
        self.components.insert(name.to_string(), component);
        result
    }

    fn run_transition(
        &self,
        name: &str,
        component: &mut ComponentPtr,
        transition: Transition,
    ) -> Result<(), LifecycleError> {
        self.run_hooks(name, &**component, transition, HookPhase::Before)?;

        debug!("Running {} of component '{}'", transition, name);

        match transition {
            Transition::Start => {
                let deps = self.resolve_dependencies(name)?;
                component.start(&deps)
            }
            Transition::Stop => component.stop(),
        }
        .map_err(|source| LifecycleError::ComponentFailed {
            component: name.to_string(),
            transition,
            source,
        })?;

        self.run_hooks(name, &**component, transition, HookPhase::After)
    }

    fn run_hooks(
        &self,
        name: &str,
        component: &dyn Component,
        transition: Transition,
        phase: HookPhase,
    ) -> Result<(), LifecycleError> {
        for hook in &self.hooks {
            hook.on_transition(name, component, transition, phase)
                .map_err(|source| LifecycleError::HookRejected {
                    component: name.to_string(),
                    transition,
                    phase,
                    source,
                })?;
        }

        Ok(())
    }

    /// Resolves the wired dependencies of `name` against the current component
    /// instances. Called after all upstream components have been started, so the
    /// injected instances carry their start-time fields (e.g. live handles).
    fn resolve_dependencies<'a>(
        &'a self,
        name: &'a str,
    ) -> Result<ResolvedDependencies<'a>, LifecycleError> {
        let mut deps = ResolvedDependencies::new(name);
        if let Some(wiring) = self.dependencies.get(name) {
            for (field, target) in wiring {
                let dependency = self
                    .components
                    .get(target)
                    .ok_or_else(|| LifecycleError::UnknownComponent(target.clone()))?;
                deps.insert(field, &**dependency);
            }
        }

        Ok(deps)
    }
}
