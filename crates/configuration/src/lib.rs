use crate::error::ConfigError;
use crate::settings::Config;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{DatabaseSettings, LogFormat, LoggingSettings};

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Prefix for environment overrides, e.g. `AUCTIONS__DATABASE__BATCH_SIZE=500`.
pub const ENV_PREFIX: &str = "AUCTIONS";

/// Loads the application configuration from the `config.toml` file.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(DEFAULT_CONFIG_FILE)
}

/// Loads configuration from `path` (optional), layered with `AUCTIONS__*`
/// environment variables, and validates the result.
///
/// An empty `database.url` is filled from `DATABASE_URL`.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .set_default("database.max_connections", 10)?
        .set_default("database.acquire_timeout_secs", 5)?
        .set_default("database.batch_size", 1000)?
        .set_default("logging.level", "info")?
        .add_source(config::File::from(path.as_ref()).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let mut config = builder.try_deserialize::<Config>()?;

    if config.database.url.is_empty() {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }
    }

    config.validate()?;
    Ok(config)
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let db = &self.database;
        if db.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "database.url (or DATABASE_URL) must be set".to_string(),
            ));
        }
        if db.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
