//! A small user lookup/insert service assembled from [cogwork] components.
//!
//! Two components cooperate: a [Database](database::Database) owning a connection to an
//! external user store, and a [UserDirectory](directory::UserDirectory) which depends on
//! it and fetches the admin user at start time. The [assembly] module wires them into a
//! [System](cogwork::system::System), optionally attaching a
//! [SchemaHook](cogwork_schema::SchemaHook) which validates both components' declared
//! shapes around every lifecycle transition.
//!
//! The store itself is reached through the [store::StoreClient] seam; an in-process
//! [store::MemoryStore] stands in for the external service.

pub mod assembly;
pub mod config;
pub mod database;
pub mod directory;
pub mod store;

pub use assembly::{build_system, bootstrap, BootstrapError};
pub use config::UserServiceConfig;
