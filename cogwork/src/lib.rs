//! Component lifecycle framework with explicit dependency wiring.
//!
//! Applications are assembled from named [Components](component::Component) which form a
//! dependency graph. A [System](system::System) owns the components, validates that the
//! declared wiring is acyclic, starts the components in dependency order (injecting each
//! started upstream component into its dependents) and stops them in reverse order.
//! [TransitionHooks](hooks::TransitionHook) can observe or veto every lifecycle
//! transition, which is the seam used for runtime shape validation.

pub mod component;
pub mod error;
pub mod hooks;
pub mod system;

pub use error::{ErrorPtr, LifecycleError, SystemBuildError};
