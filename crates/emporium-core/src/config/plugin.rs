//! Plugin runtime configuration.

use serde::{Deserialize, Serialize};

/// Plugin runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Directory containing one sub-directory per plugin.
    #[serde(default = "default_plugin_directory")]
    pub directory: String,
    /// Directory holding the compiled plugin config cache artifact.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    /// Development mode: manifests are re-read on every load and the
    /// compiled cache artifact is never read or written.
    #[serde(default)]
    pub debug: bool,
    /// Only register service extensions of enabled, non-deleted plugins.
    ///
    /// Defaults to `false`, which registers extensions of disabled plugins
    /// as well.
    #[serde(default)]
    pub extensions_require_enabled: bool,
    /// Route id prefix used when building a route table from legacy route ids.
    #[serde(default = "default_admin_route_prefix")]
    pub admin_route_prefix: String,
    /// Activation records used when no database is configured.
    #[serde(default)]
    pub activations: Vec<ActivationSeed>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            directory: default_plugin_directory(),
            cache_dir: default_cache_dir(),
            debug: false,
            extensions_require_enabled: false,
            admin_route_prefix: default_admin_route_prefix(),
            activations: Vec::new(),
        }
    }
}

/// A statically configured plugin activation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationSeed {
    /// Plugin code.
    pub code: String,
    /// Subscriber type name the handler overrides are keyed by.
    #[serde(default)]
    pub class_name: String,
    /// Whether the plugin is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Whether the plugin is soft-deleted.
    #[serde(default)]
    pub deleted: bool,
    /// Handler priority overrides.
    #[serde(default)]
    pub handlers: Vec<HandlerSeed>,
}

/// A statically configured handler priority override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerSeed {
    /// Event name.
    pub event: String,
    /// Handler method name.
    pub handler: String,
    /// Stored priority; `0` disables the handler.
    pub priority: i32,
}

fn default_plugin_directory() -> String {
    "./app/Plugin".to_string()
}

fn default_cache_dir() -> String {
    "./app/cache/plugin".to_string()
}

fn default_admin_route_prefix() -> String {
    "admin".to_string()
}

fn default_true() -> bool {
    true
}
