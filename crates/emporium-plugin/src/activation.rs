//! In-memory activation registry, seeded from configuration.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use emporium_core::config::ActivationSeed;
use emporium_core::error::AppError;
use emporium_core::result::AppResult;
use emporium_core::traits::ActivationRegistry;
use emporium_core::types::{ActivationRecord, HandlerPriority, HandlerRecord};

/// Activation records and handler overrides held in memory.
#[derive(Debug, Default)]
pub struct InMemoryActivationRegistry {
    activations: RwLock<BTreeMap<String, ActivationRecord>>,
    handlers: RwLock<Vec<HandlerRecord>>,
}

impl InMemoryActivationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from configured seeds.
    pub fn from_seeds(seeds: &[ActivationSeed]) -> Self {
        let mut activations = BTreeMap::new();
        let mut handlers = Vec::new();

        for seed in seeds {
            activations.insert(
                seed.code.clone(),
                ActivationRecord {
                    code: seed.code.clone(),
                    class_name: seed.class_name.clone(),
                    enabled: seed.enabled,
                    deleted: seed.deleted,
                },
            );
            for handler in &seed.handlers {
                handlers.push(HandlerRecord::new(
                    &seed.code,
                    &handler.event,
                    &handler.handler,
                    HandlerPriority::from_stored(handler.priority),
                ));
            }
        }

        debug!(
            plugins = activations.len(),
            handlers = handlers.len(),
            "Activation registry seeded"
        );

        Self {
            activations: RwLock::new(activations),
            handlers: RwLock::new(handlers),
        }
    }

    /// Inserts or replaces an activation record.
    pub async fn insert_activation(&self, record: ActivationRecord) {
        self.activations
            .write()
            .await
            .insert(record.code.clone(), record);
    }

    /// Flips the enabled flag of a plugin.
    pub async fn set_enabled(&self, code: &str, enabled: bool) -> AppResult<()> {
        let mut activations = self.activations.write().await;
        let record = activations
            .get_mut(code)
            .ok_or_else(|| AppError::not_found(format!("Plugin '{code}' not found")))?;
        record.enabled = enabled;
        Ok(())
    }

    /// Flips the soft-delete flag of a plugin.
    pub async fn set_deleted(&self, code: &str, deleted: bool) -> AppResult<()> {
        let mut activations = self.activations.write().await;
        let record = activations
            .get_mut(code)
            .ok_or_else(|| AppError::not_found(format!("Plugin '{code}' not found")))?;
        record.deleted = deleted;
        Ok(())
    }

    /// Inserts or replaces the override of one handler.
    pub async fn set_handler_priority(
        &self,
        code: &str,
        event: &str,
        handler: &str,
        priority: HandlerPriority,
    ) -> AppResult<()> {
        if !self.activations.read().await.contains_key(code) {
            return Err(AppError::not_found(format!("Plugin '{code}' not found")));
        }

        let mut handlers = self.handlers.write().await;
        match handlers
            .iter_mut()
            .find(|h| h.plugin_code == code && h.event == event && h.handler == handler)
        {
            Some(existing) => existing.priority = priority,
            None => handlers.push(HandlerRecord::new(code, event, handler, priority)),
        }
        Ok(())
    }
}

#[async_trait]
impl ActivationRegistry for InMemoryActivationRegistry {
    async fn list_handler_records(&self) -> AppResult<Vec<HandlerRecord>> {
        let mut records = self.handlers.read().await.clone();
        records.sort_by(|a, b| {
            a.plugin_code
                .cmp(&b.plugin_code)
                .then_with(|| a.event.cmp(&b.event))
                .then_with(|| b.priority.to_stored().cmp(&a.priority.to_stored()))
                .then_with(|| a.handler.cmp(&b.handler))
        });
        Ok(records)
    }

    async fn get_activation(&self, code: &str) -> AppResult<Option<ActivationRecord>> {
        Ok(self.activations.read().await.get(code).cloned())
    }

    async fn list_activations(&self) -> AppResult<Vec<ActivationRecord>> {
        Ok(self.activations.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use emporium_core::config::HandlerSeed;
    use emporium_core::error::ErrorKind;

    use super::*;

    fn seeds() -> Vec<ActivationSeed> {
        vec![ActivationSeed {
            code: "loyalty".to_string(),
            class_name: "LoyaltyEvent".to_string(),
            enabled: true,
            deleted: false,
            handlers: vec![
                HandlerSeed {
                    event: "order.completed".to_string(),
                    handler: "onOrderAudit".to_string(),
                    priority: 0,
                },
                HandlerSeed {
                    event: "order.completed".to_string(),
                    handler: "onOrderCompleted".to_string(),
                    priority: 200,
                },
            ],
        }]
    }

    #[tokio::test]
    async fn test_seeded_records() {
        let registry = InMemoryActivationRegistry::from_seeds(&seeds());

        let activation = registry.get_activation("loyalty").await.unwrap().unwrap();
        assert!(activation.is_active());
        assert_eq!(activation.class_name, "LoyaltyEvent");

        let handlers = registry.list_handler_records().await.unwrap();
        assert_eq!(handlers.len(), 2);
        assert_eq!(handlers[0].handler, "onOrderCompleted");
        assert_eq!(handlers[1].priority, HandlerPriority::Disabled);
    }

    #[tokio::test]
    async fn test_state_changes() {
        let registry = InMemoryActivationRegistry::from_seeds(&seeds());

        registry.set_enabled("loyalty", false).await.unwrap();
        registry
            .set_handler_priority(
                "loyalty",
                "order.completed",
                "onOrderAudit",
                HandlerPriority::Value(10),
            )
            .await
            .unwrap();

        let activation = registry.get_activation("loyalty").await.unwrap().unwrap();
        assert!(!activation.is_active());

        let handlers = registry.list_handler_records().await.unwrap();
        assert!(handlers
            .iter()
            .any(|h| h.handler == "onOrderAudit" && h.priority == HandlerPriority::Value(10)));
    }

    #[tokio::test]
    async fn test_unknown_plugin() {
        let registry = InMemoryActivationRegistry::new();
        assert!(registry.get_activation("ghost").await.unwrap().is_none());
        let err = registry.set_deleted("ghost", true).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
