//! Hook registry: listeners registered per event name with priority ordering.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use emporium_core::result::AppResult;

use super::definitions::HookEvent;

/// Trait for listener implementations attached to the dispatcher.
#[async_trait]
pub trait HookListener: Send + Sync + std::fmt::Debug {
    /// Handles one dispatch of the event the listener is registered on.
    async fn handle(&self, event: &mut HookEvent) -> AppResult<()>;

    /// Returns the code of the plugin owning this listener (`"core"` for the core).
    fn plugin_id(&self) -> &str;

    /// Returns a short label for logs and listings.
    fn label(&self) -> String {
        self.plugin_id().to_string()
    }
}

/// Entry in the hook registry.
#[derive(Debug, Clone)]
struct ListenerEntry {
    /// The listener.
    listener: Arc<dyn HookListener>,
    /// Priority (higher = earlier execution).
    priority: i32,
    /// Plugin that registered this listener.
    plugin_id: String,
}

/// A listener registration as reported by [`HookRegistry::describe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerInfo {
    /// Listener label.
    pub label: String,
    /// Owning plugin.
    pub plugin_id: String,
    /// Effective priority.
    pub priority: i32,
}

/// Registry of listeners organized by event name.
#[derive(Debug, Default)]
pub struct HookRegistry {
    /// Event name → listeners, sorted by descending priority, ties in registration order.
    listeners: RwLock<HashMap<String, Vec<ListenerEntry>>>,
}

impl HookRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for an event name.
    pub async fn register(&self, event: &str, listener: Arc<dyn HookListener>, priority: i32) {
        let plugin_id = listener.plugin_id().to_string();
        let label = listener.label();

        let mut listeners = self.listeners.write().await;
        let entries = listeners.entry(event.to_string()).or_default();

        entries.push(ListenerEntry {
            listener,
            priority,
            plugin_id: plugin_id.clone(),
        });

        // Stable sort keeps registration order among equal priorities.
        entries.sort_by(|a, b| b.priority.cmp(&a.priority));

        debug!(
            event = %event,
            plugin_id = %plugin_id,
            listener = %label,
            priority = priority,
            "Listener registered"
        );
    }

    /// Unregisters all listeners of a specific plugin.
    pub async fn unregister_plugin(&self, plugin_id: &str) {
        let mut listeners = self.listeners.write().await;

        for entries in listeners.values_mut() {
            entries.retain(|e| e.plugin_id != plugin_id);
        }

        listeners.retain(|_, entries| !entries.is_empty());

        info!(plugin_id = %plugin_id, "All listeners unregistered for plugin");
    }

    /// Drops every registration.
    pub async fn clear(&self) {
        self.listeners.write().await.clear();
    }

    /// Returns the listeners of an event in execution order.
    pub async fn get_listeners(&self, event: &str) -> Vec<Arc<dyn HookListener>> {
        let listeners = self.listeners.read().await;
        listeners
            .get(event)
            .map(|entries| entries.iter().map(|e| e.listener.clone()).collect())
            .unwrap_or_default()
    }

    /// Describes the listeners of an event in execution order.
    pub async fn describe(&self, event: &str) -> Vec<ListenerInfo> {
        let listeners = self.listeners.read().await;
        listeners
            .get(event)
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| ListenerInfo {
                        label: e.listener.label(),
                        plugin_id: e.plugin_id.clone(),
                        priority: e.priority,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns whether any listener is registered for an event.
    pub async fn has_listeners(&self, event: &str) -> bool {
        let listeners = self.listeners.read().await;
        listeners
            .get(event)
            .map(|entries| !entries.is_empty())
            .unwrap_or(false)
    }

    /// Returns the number of listeners registered for an event.
    pub async fn listener_count(&self, event: &str) -> usize {
        let listeners = self.listeners.read().await;
        listeners.get(event).map(|entries| entries.len()).unwrap_or(0)
    }

    /// Returns all event names with at least one listener, sorted.
    pub async fn registered_events(&self) -> Vec<String> {
        let listeners = self.listeners.read().await;
        let mut events: Vec<String> = listeners.keys().cloned().collect();
        events.sort();
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ClosureListener;

    fn listener(plugin: &str) -> Arc<dyn HookListener> {
        Arc::new(ClosureListener::new(plugin, |_| Ok(())))
    }

    #[tokio::test]
    async fn test_descending_priority_with_stable_ties() {
        let registry = HookRegistry::new();
        registry.register("order.completed", listener("a"), -500).await;
        registry.register("order.completed", listener("b"), 100).await;
        registry.register("order.completed", listener("c"), -500).await;
        registry.register("order.completed", listener("d"), 300).await;

        let order: Vec<String> = registry
            .describe("order.completed")
            .await
            .into_iter()
            .map(|info| info.plugin_id)
            .collect();

        assert_eq!(order, vec!["d", "b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_unregister_plugin_removes_empty_events() {
        let registry = HookRegistry::new();
        registry.register("global.request", listener("loyalty"), 0).await;
        registry.register("front.request", listener("loyalty"), 0).await;
        registry.register("front.request", listener("coupon"), 0).await;

        registry.unregister_plugin("loyalty").await;

        assert!(!registry.has_listeners("global.request").await);
        assert_eq!(registry.listener_count("front.request").await, 1);
        assert_eq!(registry.registered_events().await, vec!["front.request"]);
    }

    #[tokio::test]
    async fn test_clear() {
        let registry = HookRegistry::new();
        registry.register("global.request", listener("core"), 0).await;
        registry.clear().await;
        assert!(registry.registered_events().await.is_empty());
    }
}
