//! Assembles the user service system: declares the components, wires the directory's
//! database dependency and optionally attaches shape validation.

use crate::config::UserServiceConfig;
use crate::database::{self, Database};
use crate::directory::{self, UserDirectory, DATABASE_FIELD};
use crate::store::{MemoryStore, StoreClientPtr};
use cogwork::error::SystemBuildError;
use cogwork::system::{System, SystemBuilder};
use cogwork_schema::SchemaHook;
use config::ConfigError;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub const DATABASE_COMPONENT: &str = "database";
pub const USER_DIRECTORY_COMPONENT: &str = "user-directory";

/// Errors raised when bootstrapping the service from the environment.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Error loading configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Error assembling system: {0}")]
    Build(#[from] SystemBuildError),
    #[error("No store client available for uri: {0}")]
    UnsupportedUri(String),
}

/// Builds the startable system from a configuration and a store client. When schema
/// validation is enabled, both components' declared shapes are checked around every
/// lifecycle transition.
pub fn build_system(
    config: &UserServiceConfig,
    client: StoreClientPtr,
) -> Result<System, SystemBuildError> {
    let mut builder = SystemBuilder::new()
        .component(
            DATABASE_COMPONENT,
            Box::new(Database::new(&config.uri, client)),
        )
        .component(
            USER_DIRECTORY_COMPONENT,
            Box::new(UserDirectory::new(&config.admin_username)),
        )
        .depends_on(USER_DIRECTORY_COMPONENT, DATABASE_FIELD, DATABASE_COMPONENT);

    if config.validate_schemas {
        builder = builder.hook(Box::new(
            SchemaHook::new()
                .schema(DATABASE_COMPONENT, database::schema())
                .schema(USER_DIRECTORY_COMPONENT, directory::schema()),
        ));
    }

    builder.build()
}

/// Installs a default tracing logger honoring `RUST_LOG`.
pub fn install_tracing_logger() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn client_for_uri(uri: &str) -> Result<StoreClientPtr, BootstrapError> {
    if uri.starts_with("mem://") {
        Ok(Arc::new(MemoryStore::new()))
    } else {
        Err(BootstrapError::UnsupportedUri(uri.to_string()))
    }
}

/// Loads the configuration from the environment and builds the system, installing the
/// tracing logger when configured to do so.
pub fn bootstrap() -> Result<System, BootstrapError> {
    let config = UserServiceConfig::init_from_environment()?;

    if config.install_tracing_logger {
        install_tracing_logger();
    }

    info!("Assembling user service for store '{}'", config.uri);

    let client = client_for_uri(&config.uri)?;
    Ok(build_system(&config, client)?)
}

#[cfg(test)]
mod tests {
    use crate::assembly::{build_system, client_for_uri, BootstrapError, DATABASE_COMPONENT};
    use crate::config::UserServiceConfig;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn should_build_system_with_default_config() {
        let system =
            build_system(&UserServiceConfig::default(), Arc::new(MemoryStore::new())).unwrap();

        // the database must start before its dependent
        assert_eq!(system.start_order()[0], DATABASE_COMPONENT);
    }

    #[test]
    fn should_reject_unsupported_uri() {
        assert!(matches!(
            client_for_uri("datomic:dev://localhost:4334/users").err().unwrap(),
            BootstrapError::UnsupportedUri(..)
        ));
    }
}
