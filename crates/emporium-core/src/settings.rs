//! Runtime settings map shared with plugins.
//!
//! Plugins expose their declared constants here under their own code, as
//! `<code>.const.<key>`. The map is filled once during plugin loading and
//! passed explicitly to whoever needs it.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

/// Global configuration values visible to the core and to plugins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeSettings {
    values: Map<String, Value>,
    plugin_codes: BTreeSet<String>,
}

impl RuntimeSettings {
    /// Creates an empty settings map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the namespace of `code` with `{"const": constants}`.
    pub fn merge_plugin_constants<'a, I>(&mut self, code: &str, constants: I)
    where
        I: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        let consts: Map<String, Value> = constants
            .into_iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut namespace = Map::new();
        namespace.insert("const".to_string(), Value::Object(consts));
        self.values.insert(code.to_string(), Value::Object(namespace));
        self.plugin_codes.insert(code.to_string());
    }

    /// Removes every namespace written by [`merge_plugin_constants`](Self::merge_plugin_constants).
    pub fn clear_plugin_constants(&mut self) {
        for code in std::mem::take(&mut self.plugin_codes) {
            self.values.remove(&code);
        }
    }

    /// Returns one constant declared by a plugin.
    pub fn plugin_constant(&self, code: &str, key: &str) -> Option<&Value> {
        self.values.get(code)?.get("const")?.get(key)
    }

    /// Returns a top-level value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Sets a top-level value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Returns whether a plugin namespace exists.
    pub fn has_plugin(&self, code: &str) -> bool {
        self.values.contains_key(code)
    }

    /// Returns the whole settings map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}
