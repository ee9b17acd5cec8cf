//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod database;
pub mod logging;
pub mod plugin;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::plugin::{ActivationSeed, HandlerSeed, PluginConfig};

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default file + environment overlay + env vars).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Plugin runtime settings.
    #[serde(default)]
    pub plugins: PluginConfig,
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// Merges the given file with an environment-specific overlay living next
    /// to it (`<dir>/<EMPORIUM_ENV>.toml`) and environment variables prefixed
    /// with `EMPORIUM_`. Missing files fall back to defaults.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let env = std::env::var("EMPORIUM_ENV").unwrap_or_else(|_| "development".to_string());
        let overlay = Path::new(path).with_file_name(format!("{env}.toml"));

        let config = config::Config::builder()
            .add_source(config::File::from(Path::new(path)).required(false))
            .add_source(config::File::from(overlay.as_path()).required(false))
            .add_source(
                config::Environment::with_prefix("EMPORIUM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        tracing::debug!(
            path = %path,
            env = %env,
            plugin_dir = %parsed.plugins.directory,
            debug = parsed.plugins.debug,
            "Configuration loaded"
        );
        Ok(parsed)
    }

    /// Parse configuration from an in-memory TOML string.
    pub fn from_toml(content: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
