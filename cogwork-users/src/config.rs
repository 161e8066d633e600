//! Service configuration, created with opinionated default values which can be
//! overwritten by environment variables prefixed with `COGWORK_USERS_` or a
//! `cogwork-users.json` file.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const CONFIG_ENV_PREFIX: &str = "COGWORK_USERS";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "cogwork-users.json";

/// Configuration for the user service system.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct UserServiceConfig {
    /// Connection string for the user store.
    pub uri: String,
    /// Username fetched by the directory component at start time.
    pub admin_username: String,
    /// Should component shapes be validated around every lifecycle transition.
    pub validate_schemas: bool,
    /// Should a default tracing logger be installed when bootstrapping.
    pub install_tracing_logger: bool,
}

impl Default for UserServiceConfig {
    fn default() -> Self {
        Self {
            uri: "mem://users".to_string(),
            admin_username: "admin".to_string(),
            validate_schemas: true,
            install_tracing_logger: true,
        }
    }
}

impl From<OptionalUserServiceConfig> for UserServiceConfig {
    fn from(value: OptionalUserServiceConfig) -> Self {
        let default = Self::default();
        Self {
            uri: value.uri.unwrap_or(default.uri),
            admin_username: value.admin_username.unwrap_or(default.admin_username),
            validate_schemas: value.validate_schemas.unwrap_or(default.validate_schemas),
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
        }
    }
}

impl UserServiceConfig {
    pub fn init_from_environment() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(CONFIG_ENV_PREFIX))
            .build()
            .and_then(|config| config.try_deserialize::<OptionalUserServiceConfig>())
            .map(|config| config.into())
    }
}

#[derive(Deserialize)]
struct OptionalUserServiceConfig {
    uri: Option<String>,
    admin_username: Option<String>,
    validate_schemas: Option<bool>,
    install_tracing_logger: Option<bool>,
}
