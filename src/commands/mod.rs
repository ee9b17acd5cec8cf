//! CLI command definitions and dispatch.

pub mod cache;
pub mod config;
pub mod hooks;
pub mod migrate;
pub mod plugin;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use emporium_core::config::AppConfig;
use emporium_core::error::AppError;
use emporium_core::result::AppResult;
use emporium_core::traits::ActivationRegistry;
use emporium_database::{DatabasePool, PgActivationRegistry};
use emporium_plugin::InMemoryActivationRegistry;

use crate::output::OutputFormat;

/// Emporium: plugin extension runtime tooling
#[derive(Debug, Parser)]
#[command(name = "emporium", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Installed plugins and their resolved bindings
    Plugin(plugin::PluginArgs),
    /// Compiled plugin config cache
    Cache(cache::CacheArgs),
    /// Hook point cascades
    Hooks(hooks::HooksArgs),
    /// Configuration management
    Config(config::ConfigArgs),
    /// Database migration management
    Migrate(migrate::MigrateArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        match &self.command {
            Commands::Plugin(args) => plugin::execute(args, &config, self.format).await,
            Commands::Cache(args) => cache::execute(args, &config).await,
            Commands::Hooks(args) => hooks::execute(args, &config, self.format).await,
            Commands::Config(args) => config::execute(args, &config, &self.config, self.format).await,
            Commands::Migrate(args) => migrate::execute(args, &config).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> AppResult<AppConfig> {
    AppConfig::load(config_path)
        .map_err(|e| AppError::configuration(format!("Failed to load config: {e}")))
}

/// Helper: activation registry selected by configuration
pub async fn activation_registry(config: &AppConfig) -> AppResult<Arc<dyn ActivationRegistry>> {
    if config.database.enabled {
        let pool = DatabasePool::connect(&config.database).await?;
        Ok(Arc::new(PgActivationRegistry::new(pool.pool().clone())))
    } else {
        Ok(Arc::new(InMemoryActivationRegistry::from_seeds(
            &config.plugins.activations,
        )))
    }
}
