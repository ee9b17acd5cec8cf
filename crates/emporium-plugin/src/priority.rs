//! Priority resolution: merges declared bindings with persisted overrides.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;
use tracing::warn;

use emporium_core::types::{
    ActivationRecord, EVENT_PRIORITY_LATEST, HandlerPriority, HandlerRecord,
};

use crate::manifest::Manifest;

/// What the loader does with one declared binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "priority", rename_all = "snake_case")]
pub enum EffectivePriority {
    /// Attach the handler with this priority.
    Attach(i32),
    /// Do not attach the handler.
    Skip,
}

impl EffectivePriority {
    /// Priority to attach with, if any.
    pub fn attach_priority(&self) -> Option<i32> {
        match self {
            Self::Attach(p) => Some(*p),
            Self::Skip => None,
        }
    }

    /// Whether the binding gets a listener.
    pub fn is_attached(&self) -> bool {
        matches!(self, Self::Attach(_))
    }
}

impl fmt::Display for EffectivePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attach(p) => write!(f, "attach({p})"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Identity of one declared binding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BindingKey {
    /// Plugin code.
    pub plugin_code: String,
    /// Event name.
    pub event: String,
    /// Handler method name.
    pub method: String,
}

impl BindingKey {
    /// Creates a key.
    pub fn new(plugin_code: &str, event: &str, method: &str) -> Self {
        Self {
            plugin_code: plugin_code.to_string(),
            event: event.to_string(),
            method: method.to_string(),
        }
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}::{}", self.event, self.plugin_code, self.method)
    }
}

/// Handler overrides keyed by (subscriber class name, event, method).
#[derive(Debug, Clone, Default)]
pub struct OverrideIndex {
    entries: HashMap<(String, String, String), HandlerPriority>,
}

impl OverrideIndex {
    /// Builds the index in one pass over the handler records.
    ///
    /// Records of disabled or soft-deleted plugins are indexed as `Disabled`.
    /// Records whose plugin has no activation record are dropped.
    pub fn build(handlers: &[HandlerRecord], activations: &[ActivationRecord]) -> Self {
        let by_code: HashMap<&str, &ActivationRecord> =
            activations.iter().map(|a| (a.code.as_str(), a)).collect();

        let mut entries = HashMap::with_capacity(handlers.len());
        for record in handlers {
            let Some(activation) = by_code.get(record.plugin_code.as_str()) else {
                continue;
            };

            let priority = if activation.is_active() {
                record.priority
            } else {
                HandlerPriority::Disabled
            };

            if let HandlerPriority::Value(p) = priority {
                if p <= EVENT_PRIORITY_LATEST {
                    warn!(
                        plugin_code = %record.plugin_code,
                        event = %record.event,
                        handler = %record.handler,
                        priority = p,
                        "Override priority is not above the default latest priority"
                    );
                }
            }

            entries.insert(
                (
                    activation.class_name.clone(),
                    record.event.clone(),
                    record.handler.clone(),
                ),
                priority,
            );
        }

        Self { entries }
    }

    /// Looks up the override of one binding.
    pub fn lookup(&self, class_name: &str, event: &str, method: &str) -> Option<HandlerPriority> {
        self.entries
            .get(&(class_name.to_string(), event.to_string(), method.to_string()))
            .copied()
    }

    /// Number of indexed overrides.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no override is indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decides `Attach`/`Skip` for every declared binding of a load pass.
#[derive(Debug, Clone, Default)]
pub struct PriorityResolver {
    activations: HashMap<String, ActivationRecord>,
    overrides: OverrideIndex,
}

impl PriorityResolver {
    /// Creates a resolver from the records fetched for one load pass.
    pub fn new(activations: Vec<ActivationRecord>, handlers: &[HandlerRecord]) -> Self {
        let overrides = OverrideIndex::build(handlers, &activations);
        let activations = activations
            .into_iter()
            .map(|a| (a.code.clone(), a))
            .collect();
        Self {
            activations,
            overrides,
        }
    }

    /// Activation record of a plugin.
    pub fn activation(&self, code: &str) -> Option<&ActivationRecord> {
        self.activations.get(code)
    }

    /// The override index built for this pass.
    pub fn overrides(&self) -> &OverrideIndex {
        &self.overrides
    }

    /// Resolves one declared binding of `manifest`.
    pub fn resolve_binding(&self, manifest: &Manifest, event: &str, method: &str) -> EffectivePriority {
        let Some(activation) = self.activation(&manifest.code) else {
            return EffectivePriority::Skip;
        };
        if !activation.is_active() {
            return EffectivePriority::Skip;
        }
        let Some(subscriber) = manifest.subscriber.as_deref() else {
            return EffectivePriority::Skip;
        };

        // Overrides recorded under another class name do not apply.
        if activation.class_name != subscriber {
            return EffectivePriority::Attach(EVENT_PRIORITY_LATEST);
        }

        match self.overrides.lookup(subscriber, event, method) {
            None => EffectivePriority::Attach(EVENT_PRIORITY_LATEST),
            Some(HandlerPriority::Disabled) => EffectivePriority::Skip,
            Some(HandlerPriority::Value(p)) => EffectivePriority::Attach(p),
        }
    }

    /// Resolves every binding of `manifest`, in declaration order.
    pub fn resolve_manifest(&self, manifest: &Manifest) -> Vec<(BindingKey, EffectivePriority)> {
        if manifest.subscriber.is_none() && manifest.binding_count() > 0 {
            warn!(
                plugin_code = %manifest.code,
                bindings = manifest.binding_count(),
                "Plugin declares event bindings but no subscriber type"
            );
        }

        manifest
            .bindings()
            .map(|(event, method)| {
                (
                    BindingKey::new(&manifest.code, event, method),
                    self.resolve_binding(manifest, event, method),
                )
            })
            .collect()
    }

    /// Resolves every binding of every manifest.
    pub fn resolve_all(
        &self,
        manifests: &BTreeMap<String, Manifest>,
    ) -> BTreeMap<BindingKey, EffectivePriority> {
        manifests
            .values()
            .flat_map(|manifest| self.resolve_manifest(manifest))
            .collect()
    }
}
