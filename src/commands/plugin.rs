//! Plugin inspection commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use emporium_core::config::AppConfig;
use emporium_core::result::AppResult;
use emporium_core::types::ActivationRecord;
use emporium_plugin::manifest_provider;
use emporium_plugin::priority::PriorityResolver;

use crate::output::{self, OutputFormat};

/// Arguments for plugin commands
#[derive(Debug, Args)]
pub struct PluginArgs {
    /// Plugin subcommand
    #[command(subcommand)]
    pub command: PluginCommand,
}

/// Plugin subcommands
#[derive(Debug, Subcommand)]
pub enum PluginCommand {
    /// List discovered plugins with their activation state
    List,
    /// Show the resolved priority of every declared binding
    Bindings {
        /// Only show bindings of this plugin
        #[arg(short, long)]
        plugin: Option<String>,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct PluginRow {
    code: String,
    name: String,
    version: String,
    subscriber: String,
    bindings: usize,
    extensions: usize,
    state: &'static str,
}

#[derive(Debug, Serialize, Tabled)]
struct BindingRow {
    plugin: String,
    event: String,
    method: String,
    resolution: String,
}

fn state_of(record: Option<&ActivationRecord>) -> &'static str {
    match record {
        None => "not installed",
        Some(r) if r.deleted => "deleted",
        Some(r) if !r.enabled => "disabled",
        Some(_) => "enabled",
    }
}

/// Execute plugin commands
pub async fn execute(args: &PluginArgs, config: &AppConfig, format: OutputFormat) -> AppResult<()> {
    let manifests = manifest_provider(&config.plugins).get().await?;
    let registry = super::activation_registry(config).await?;

    let activations = registry.list_activations().await?;
    let handlers = registry.list_handler_records().await?;
    let resolver = PriorityResolver::new(activations, &handlers);

    match &args.command {
        PluginCommand::List => {
            let rows: Vec<PluginRow> = manifests
                .values()
                .map(|m| PluginRow {
                    code: m.code.clone(),
                    name: m.name.clone(),
                    version: m.version.clone(),
                    subscriber: m.subscriber.clone().unwrap_or_else(|| "-".to_string()),
                    bindings: m.binding_count(),
                    extensions: m.extensions.len(),
                    state: state_of(resolver.activation(&m.code)),
                })
                .collect();
            output::print_list(&rows, format);
        }
        PluginCommand::Bindings { plugin } => {
            let rows: Vec<BindingRow> = manifests
                .values()
                .filter(|m| plugin.as_deref().is_none_or(|code| code == m.code))
                .flat_map(|m| resolver.resolve_manifest(m))
                .map(|(key, priority)| BindingRow {
                    plugin: key.plugin_code,
                    event: key.event,
                    method: key.method,
                    resolution: priority.to_string(),
                })
                .collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_of() {
        let record = ActivationRecord::enabled("loyalty", "LoyaltyEvent");
        assert_eq!(state_of(None), "not installed");
        assert_eq!(state_of(Some(&record)), "enabled");
        assert_eq!(state_of(Some(&record.clone().with_enabled(false))), "disabled");
        assert_eq!(state_of(Some(&record.with_deleted(true))), "deleted");
    }
}
