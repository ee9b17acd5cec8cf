//! Factory registry: turns type names declared in manifests into instances.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::services::ServiceExtension;
use crate::traits::EventSubscriber;

/// What a factory knows about the plugin it builds for.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginContext {
    /// Plugin code.
    pub code: String,
    /// Plugin directory.
    pub directory: PathBuf,
    /// Constants declared by the plugin.
    pub constants: BTreeMap<String, serde_json::Value>,
}

impl PluginContext {
    /// Creates a context.
    pub fn new(
        code: impl Into<String>,
        directory: impl Into<PathBuf>,
        constants: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            code: code.into(),
            directory: directory.into(),
            constants,
        }
    }

    /// Returns one declared constant.
    pub fn constant(&self, key: &str) -> Option<&serde_json::Value> {
        self.constants.get(key)
    }

    /// Resolves a path relative to the plugin directory.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.directory.join(relative)
    }
}

type SubscriberFactory = Arc<dyn Fn(&PluginContext) -> Arc<dyn EventSubscriber> + Send + Sync>;
type ExtensionFactory = Arc<dyn Fn(&PluginContext) -> Arc<dyn ServiceExtension> + Send + Sync>;

/// Constructors for the subscriber and extension types plugins may declare.
#[derive(Clone, Default)]
pub struct PluginFactoryRegistry {
    subscribers: HashMap<String, SubscriberFactory>,
    extensions: HashMap<String, ExtensionFactory>,
}

impl std::fmt::Debug for PluginFactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginFactoryRegistry")
            .field("subscribers", &self.subscriber_types())
            .field("extensions", &self.extension_types())
            .finish()
    }
}

impl PluginFactoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the constructor of a subscriber type.
    pub fn register_subscriber<F>(&mut self, type_name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&PluginContext) -> Arc<dyn EventSubscriber> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        debug!(type_name = %type_name, "Subscriber factory registered");
        self.subscribers.insert(type_name, Arc::new(factory));
        self
    }

    /// Registers the constructor of a service extension type.
    pub fn register_extension<F>(&mut self, type_name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&PluginContext) -> Arc<dyn ServiceExtension> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        debug!(type_name = %type_name, "Extension factory registered");
        self.extensions.insert(type_name, Arc::new(factory));
        self
    }

    /// Builds a subscriber, `None` when the type is unknown.
    pub fn create_subscriber(
        &self,
        type_name: &str,
        ctx: &PluginContext,
    ) -> Option<Arc<dyn EventSubscriber>> {
        self.subscribers.get(type_name).map(|factory| factory(ctx))
    }

    /// Builds a service extension, `None` when the type is unknown.
    pub fn create_extension(
        &self,
        type_name: &str,
        ctx: &PluginContext,
    ) -> Option<Arc<dyn ServiceExtension>> {
        self.extensions.get(type_name).map(|factory| factory(ctx))
    }

    /// Registered subscriber type names, sorted.
    pub fn subscriber_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.subscribers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered extension type names, sorted.
    pub fn extension_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.extensions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use emporium_core::result::AppResult;

    use super::*;
    use crate::hooks::definitions::HookEvent;

    #[derive(Debug)]
    struct RateSubscriber {
        rate: i64,
    }

    #[async_trait]
    impl EventSubscriber for RateSubscriber {
        fn handles(&self, method: &str) -> bool {
            method == "onOrderCompleted"
        }

        async fn call(&self, _method: &str, event: &mut HookEvent) -> AppResult<()> {
            event.set("rate", json!(self.rate));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_subscriber_built_with_plugin_constants() {
        let mut factories = PluginFactoryRegistry::new();
        factories.register_subscriber("LoyaltyEvent", |ctx| {
            let rate = ctx.constant("points_rate").and_then(|v| v.as_i64()).unwrap_or(1);
            Arc::new(RateSubscriber { rate })
        });

        let ctx = PluginContext::new(
            "loyalty",
            "/plugins/loyalty",
            BTreeMap::from([("points_rate".to_string(), json!(7))]),
        );

        let subscriber = factories.create_subscriber("LoyaltyEvent", &ctx).unwrap();
        let mut event = HookEvent::new();
        subscriber.call("onOrderCompleted", &mut event).await.unwrap();

        assert_eq!(event.get_i64("rate"), Some(7));
        assert!(factories.create_subscriber("Unknown", &ctx).is_none());
        assert_eq!(factories.subscriber_types(), vec!["LoyaltyEvent"]);
        assert_eq!(ctx.resolve("Resource/mapping"), PathBuf::from("/plugins/loyalty/Resource/mapping"));
    }
}
