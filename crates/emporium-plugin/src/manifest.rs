//! Plugin manifests: identity, declared event bindings, extensions and constants.
//!
//! A manifest is built from the two YAML files of a plugin directory:
//!
//! ```yaml
//! # config.yml
//! name: Loyalty Points
//! code: loyalty
//! version: 1.2.0
//! event: LoyaltyEvent
//! service: [LoyaltyServiceProvider]
//! orm.path: [/Resource/doctrine]
//! const:
//!   points_rate: 5
//! ```
//!
//! ```yaml
//! # event.yml
//! order.completed:
//!   - [onOrderCompleted, NORMAL]
//! front.request:
//!   - onFrontRequest
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use emporium_core::error::{AppError, ErrorKind};
use emporium_core::result::AppResult;

/// Handler methods bound to one event name, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBinding {
    /// Event (hook point) name.
    pub event: String,
    /// Handler method names.
    pub handlers: Vec<String>,
}

/// Immutable description of one installed plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Plugin code, equal to the plugin directory name.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Version string.
    pub version: String,
    /// Subscriber type name handling the declared events.
    pub subscriber: Option<String>,
    /// Service extension type names.
    pub extensions: Vec<String>,
    /// Declared event bindings, in declaration order.
    pub events: Vec<EventBinding>,
    /// Constants published under the plugin's namespace.
    pub constants: BTreeMap<String, serde_json::Value>,
    /// Additional data-mapping paths, relative to the plugin directory.
    pub mapping_paths: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    version: Option<serde_yaml::Value>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    service: Option<Vec<String>>,
    #[serde(default, rename = "orm.path")]
    orm_path: Option<Vec<String>>,
    #[serde(default)]
    orm: Option<RawOrm>,
    #[serde(default, rename = "const")]
    constants: Option<BTreeMap<String, serde_json::Value>>,
}

/// Nested `orm: { path: [...] }` spelling, accepted when the flat key is absent.
#[derive(Debug, Deserialize)]
struct RawOrm {
    #[serde(default)]
    path: Option<Vec<String>>,
}

impl Manifest {
    /// Builds a manifest from the contents of `config.yml` and, if present, `event.yml`.
    ///
    /// `dir_code` is the plugin directory name; the declared code must match it.
    pub fn parse(dir_code: &str, config_yml: &str, event_yml: Option<&str>) -> AppResult<Self> {
        let raw: RawConfig = serde_yaml::from_str(config_yml).map_err(|e| {
            AppError::with_source(
                ErrorKind::Validation,
                format!("Invalid config.yml for plugin '{dir_code}': {e}"),
                e,
            )
        })?;

        let code = raw.code.unwrap_or_default();
        let name = raw.name.unwrap_or_default();

        if code.trim().is_empty() {
            return Err(AppError::validation(format!(
                "Plugin '{dir_code}' declares no code"
            )));
        }
        if name.trim().is_empty() {
            return Err(AppError::validation(format!(
                "Plugin '{dir_code}' declares no name"
            )));
        }
        if code != dir_code {
            return Err(AppError::validation(format!(
                "Plugin code '{code}' does not match directory '{dir_code}'"
            )));
        }

        let events = match event_yml {
            Some(content) => parse_events(dir_code, content)?,
            None => Vec::new(),
        };

        Ok(Self {
            code,
            name,
            version: raw.version.as_ref().map(render_scalar).unwrap_or_default(),
            subscriber: raw.event.filter(|s| !s.trim().is_empty()),
            extensions: raw.service.unwrap_or_default(),
            events,
            constants: raw.constants.unwrap_or_default(),
            mapping_paths: raw
                .orm_path
                .or_else(|| raw.orm.and_then(|orm| orm.path))
                .unwrap_or_default(),
        })
    }

    /// Iterates `(event, method)` pairs in declaration order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.events.iter().flat_map(|binding| {
            binding
                .handlers
                .iter()
                .map(move |method| (binding.event.as_str(), method.as_str()))
        })
    }

    /// Data-mapping directories under `directory`, the plugin's own folder.
    ///
    /// Declared paths are relative to the plugin folder even when written with a
    /// leading `/`.
    pub fn resolve_mapping_paths(&self, directory: &Path) -> Vec<PathBuf> {
        self.mapping_paths
            .iter()
            .map(|p| p.trim_start_matches('/'))
            .filter(|p| !p.is_empty())
            .map(|p| directory.join(p))
            .collect()
    }

    /// Number of declared `(event, method)` pairs.
    pub fn binding_count(&self) -> usize {
        self.events.iter().map(|b| b.handlers.len()).sum()
    }
}

fn render_scalar(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn parse_events(code: &str, content: &str) -> AppResult<Vec<EventBinding>> {
    let invalid = |detail: String| {
        AppError::validation(format!("Invalid event.yml for plugin '{code}': {detail}"))
    };

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let root: serde_yaml::Value = serde_yaml::from_str(content)?;
    let mapping = match root {
        serde_yaml::Value::Null => return Ok(Vec::new()),
        serde_yaml::Value::Mapping(mapping) => mapping,
        _ => return Err(invalid("top level must be a mapping".to_string())),
    };

    let mut events = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let event = key
            .as_str()
            .ok_or_else(|| invalid("event names must be strings".to_string()))?
            .to_string();

        let entries = match value {
            serde_yaml::Value::Null => Vec::new(),
            serde_yaml::Value::Sequence(entries) => entries,
            _ => return Err(invalid(format!("handlers of '{event}' must be a list"))),
        };

        let mut handlers = Vec::with_capacity(entries.len());
        for entry in &entries {
            // `[method, NORMAL]` carries a legacy priority hint that is ignored.
            let method = match entry {
                serde_yaml::Value::String(method) => Some(method.as_str()),
                serde_yaml::Value::Sequence(parts) => parts.first().and_then(|p| p.as_str()),
                _ => None,
            };
            match method {
                Some(m) if !m.trim().is_empty() => handlers.push(m.to_string()),
                _ => return Err(invalid(format!("malformed handler under '{event}'"))),
            }
        }

        events.push(EventBinding { event, handlers });
    }

    Ok(events)
}
