//! Configuration management CLI commands.

use std::path::Path;

use clap::{Args, Subcommand};

use emporium_core::config::AppConfig;
use emporium_core::result::AppResult;
use emporium_database::connection::mask_password;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Validate configuration and plugin paths
    Validate,
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config: &AppConfig,
    config_path: &str,
    format: OutputFormat,
) -> AppResult<()> {
    match &args.command {
        ConfigCommand::Show => {
            output::print_item(config, format);
        }
        ConfigCommand::Validate => {
            output::print_success(&format!("Configuration '{config_path}' is valid"));
            output::print_kv("Plugin directory", &config.plugins.directory);
            output::print_kv("Cache directory", &config.plugins.cache_dir);
            output::print_kv("Development mode", &config.plugins.debug.to_string());
            if config.database.enabled {
                output::print_kv("Database", &mask_password(&config.database.url));
            } else {
                output::print_kv(
                    "Activations",
                    &format!("{} configured", config.plugins.activations.len()),
                );
            }

            if !Path::new(&config.plugins.directory).is_dir() {
                output::print_warning(&format!(
                    "Plugin directory '{}' does not exist",
                    config.plugins.directory
                ));
            }
            for seed in &config.plugins.activations {
                if seed.class_name.is_empty() {
                    output::print_warning(&format!(
                        "Activation '{}' has no class name; its overrides never apply",
                        seed.code
                    ));
                }
            }
        }
    }

    Ok(())
}
