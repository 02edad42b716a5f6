use crate::error::ConfigError;
use std::env;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    Collections, DatabaseSettings, DefaultRoleSettings, Environment, LoggingSettings,
    OutputFormat, OutputSettings, RenameSettings, Settings,
};

/// Loads the tool's settings.
///
/// Sources, lowest precedence first: built-in defaults, the TOML file at
/// `path` (optional), `BOUTIQUE__*` environment variables (`__` separates
/// sections, e.g. `BOUTIQUE__COLLECTIONS__ROLES`; `default_role.grants`
/// takes a comma-separated list), and finally the
/// storefront's own variables `MONGODB_URI`, `MONGODB_DATABASE` and
/// `NODE_ENV`. The result is validated before it is returned.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix("BOUTIQUE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("default_role.grants"),
        )
        .set_override_option("database.uri", env::var("MONGODB_URI").ok())?
        .set_override_option("database.name", env::var("MONGODB_DATABASE").ok())?
        .set_override_option("environment", env::var("NODE_ENV").ok())?
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;
    settings.validate()?;

    Ok(settings)
}
