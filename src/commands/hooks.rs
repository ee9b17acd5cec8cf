//! Hook cascade inspection commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use emporium_core::config::AppConfig;
use emporium_core::result::AppResult;
use emporium_plugin::hooks::{HookCascade, HookPhase, RouteMatch, RouteTable, Scope};

use crate::output::{self, OutputFormat};

/// Arguments for hooks commands
#[derive(Debug, Args)]
pub struct HooksArgs {
    /// Hooks subcommand
    #[command(subcommand)]
    pub command: HooksCommand,
}

/// Hooks subcommands
#[derive(Debug, Subcommand)]
pub enum HooksCommand {
    /// Print the hook points fired for a route and phase, in order
    Cascade {
        /// Matched route id
        #[arg(short, long)]
        route: String,
        /// Route scope (admin or front); derived from the admin route prefix when omitted
        #[arg(short, long)]
        scope: Option<Scope>,
        /// Lifecycle phase
        #[arg(short, long)]
        phase: HookPhase,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct HookRow {
    order: usize,
    hook: String,
}

fn route_for(route: &str, scope: Option<Scope>, admin_prefix: &str) -> RouteMatch {
    match scope {
        Some(scope) => RouteMatch::new(route, scope),
        None => RouteTable::with_prefix_rule(admin_prefix, [route]).resolve(route),
    }
}

/// Execute hooks commands
pub async fn execute(args: &HooksArgs, config: &AppConfig, format: OutputFormat) -> AppResult<()> {
    match &args.command {
        HooksCommand::Cascade {
            route,
            scope,
            phase,
        } => {
            let matched = route_for(route, *scope, &config.plugins.admin_route_prefix);
            let rows: Vec<HookRow> = HookCascade::plan(*phase, &matched)
                .iter()
                .enumerate()
                .map(|(i, point)| HookRow {
                    order: i + 1,
                    hook: point.name(),
                })
                .collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
