//! Plugin config cache commands.

use std::sync::Arc;

use clap::{Args, Subcommand};

use emporium_core::config::AppConfig;
use emporium_core::result::AppResult;
use emporium_plugin::provider::ManifestProvider;
use emporium_plugin::{CachedManifestProvider, DirectManifestProvider, ManifestStore};

use crate::output;

/// Arguments for cache commands
#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Cache subcommand
    #[command(subcommand)]
    pub command: CacheCommand,
}

/// Cache subcommands
#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Rebuild the compiled artifact from the plugin directory
    Warm,
    /// Delete the compiled artifact
    Clear,
    /// Show the artifact state
    Status,
}

/// Execute cache commands
pub async fn execute(args: &CacheArgs, config: &AppConfig) -> AppResult<()> {
    let plugins = &config.plugins;
    let cache = CachedManifestProvider::new(
        Arc::new(DirectManifestProvider::new(ManifestStore::new(&plugins.directory))),
        &plugins.cache_dir,
    );

    if plugins.debug {
        output::print_warning("Development mode is on; the runtime does not read this cache");
    }

    match &args.command {
        CacheCommand::Warm => {
            let manifests = cache.warm().await?;
            output::print_success(&format!(
                "Cached {} plugin(s) in '{}'",
                manifests.len(),
                cache.artifact_path().display()
            ));
        }
        CacheCommand::Clear => {
            cache.invalidate().await?;
            let swept = cache.sweep_temp_files().await?;
            output::print_success(&format!(
                "Plugin config cache cleared ({swept} stale temp file(s) removed)"
            ));
        }
        CacheCommand::Status => {
            let status = cache.status().await;
            println!("Plugin Config Cache:");
            output::print_kv("Artifact", &status.path.display().to_string());
            output::print_kv("Exists", &status.exists.to_string());
            output::print_kv(
                "Plugins",
                &status
                    .plugins
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
    }

    Ok(())
}
