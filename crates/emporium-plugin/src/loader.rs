//! Plugin loader: wires manifests, activation state and factories into the hook registry.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, info, warn};

use emporium_core::config::PluginConfig;
use emporium_core::error::AppError;
use emporium_core::result::AppResult;
use emporium_core::settings::RuntimeSettings;
use emporium_core::traits::ActivationRegistry;

use crate::factory::{PluginContext, PluginFactoryRegistry};
use crate::hooks::registry::HookRegistry;
use crate::manifest::Manifest;
use crate::priority::{BindingKey, EffectivePriority, PriorityResolver};
use crate::provider::ManifestProvider;
use crate::services::ServiceContainer;
use crate::traits::SubscriberListener;

/// A listener attached during a load pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachedListener {
    /// Event name.
    pub event: String,
    /// Owning plugin.
    pub plugin_code: String,
    /// Handler method.
    pub method: String,
    /// Priority it was attached with.
    pub priority: i32,
}

/// What a load pass did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    /// Codes of every discovered plugin, in load order.
    pub plugins: Vec<String>,
    /// Listeners attached, in registration order.
    pub attached: Vec<AttachedListener>,
    /// Bindings resolved to `Skip`.
    pub skipped: Vec<BindingKey>,
    /// `code::Type` of subscriber types with no registered factory.
    pub missing_subscribers: Vec<String>,
    /// Attached bindings whose method the subscriber does not expose.
    pub missing_handlers: Vec<BindingKey>,
    /// `code::Type` of registered service extensions.
    pub extensions: Vec<String>,
    /// `code::Type` of extension types with no registered factory.
    pub missing_extensions: Vec<String>,
    /// `code::Type` of extensions whose registration failed.
    pub failed_extensions: Vec<String>,
    /// Data-mapping paths of every plugin, resolved against the plugin root.
    pub mapping_paths: Vec<PathBuf>,
}

/// Loads every discovered plugin once, before the first dispatch.
#[derive(Debug)]
pub struct PluginLoader {
    provider: Arc<dyn ManifestProvider>,
    activations: Arc<dyn ActivationRegistry>,
    factories: Arc<PluginFactoryRegistry>,
    registry: Arc<HookRegistry>,
    plugin_root: PathBuf,
    extensions_require_enabled: bool,
    loaded: AtomicBool,
}

impl PluginLoader {
    /// Creates a loader.
    pub fn new(
        provider: Arc<dyn ManifestProvider>,
        activations: Arc<dyn ActivationRegistry>,
        factories: Arc<PluginFactoryRegistry>,
        registry: Arc<HookRegistry>,
        config: &PluginConfig,
    ) -> Self {
        Self {
            provider,
            activations,
            factories,
            registry,
            plugin_root: PathBuf::from(&config.directory),
            extensions_require_enabled: config.extensions_require_enabled,
            loaded: AtomicBool::new(false),
        }
    }

    /// Whether `load_all` has completed.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Loads all plugins.
    ///
    /// Refused with a plugin error when the loader already ran; use
    /// [`reload`](Self::reload) to load again.
    pub async fn load_all(
        &self,
        settings: &mut RuntimeSettings,
        services: &mut ServiceContainer,
    ) -> AppResult<LoadReport> {
        if self
            .loaded
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::plugin(
                "Plugins are already loaded; use reload to load them again",
            ));
        }

        match self.load_pass(settings, services).await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.loaded.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Drops every listener registration and loads all plugins again.
    ///
    /// Plugin constants in `settings` and extension services in `services`
    /// from the previous pass are removed first.
    pub async fn reload(
        &self,
        settings: &mut RuntimeSettings,
        services: &mut ServiceContainer,
    ) -> AppResult<LoadReport> {
        self.registry.clear().await;
        settings.clear_plugin_constants();
        services.clear_extensions();
        self.loaded.store(false, Ordering::SeqCst);
        info!("Reloading plugins");
        self.load_all(settings, services).await
    }

    async fn load_pass(
        &self,
        settings: &mut RuntimeSettings,
        services: &mut ServiceContainer,
    ) -> AppResult<LoadReport> {
        let manifests = self.provider.get().await?;
        let activations = self.activations.list_activations().await?;
        let handlers = self.activations.list_handler_records().await?;
        let resolver = PriorityResolver::new(activations, &handlers);

        let mut report = LoadReport::default();

        for manifest in manifests.values() {
            report.plugins.push(manifest.code.clone());

            if !manifest.constants.is_empty() {
                settings.merge_plugin_constants(&manifest.code, &manifest.constants);
            }

            let directory = self.plugin_root.join(&manifest.code);
            report
                .mapping_paths
                .extend(manifest.resolve_mapping_paths(&directory));

            let ctx = PluginContext::new(&manifest.code, directory, manifest.constants.clone());
            let active = resolver
                .activation(&manifest.code)
                .is_some_and(|a| a.is_active());

            if active || !self.extensions_require_enabled {
                self.register_extensions(manifest, &ctx, services, &mut report);
            }

            if !active {
                debug!(plugin_code = %manifest.code, "Plugin is not active, no subscriber attached");
                report.skipped.extend(
                    manifest
                        .bindings()
                        .map(|(event, method)| BindingKey::new(&manifest.code, event, method)),
                );
                continue;
            }

            self.attach_subscriber(manifest, &ctx, &resolver, &mut report)
                .await;
        }

        info!(
            plugins = report.plugins.len(),
            attached = report.attached.len(),
            skipped = report.skipped.len(),
            extensions = report.extensions.len(),
            "Plugins loaded"
        );

        Ok(report)
    }

    fn register_extensions(
        &self,
        manifest: &Manifest,
        ctx: &PluginContext,
        services: &mut ServiceContainer,
        report: &mut LoadReport,
    ) {
        for type_name in &manifest.extensions {
            let label = format!("{}::{}", manifest.code, type_name);

            let Some(extension) = self.factories.create_extension(type_name, ctx) else {
                warn!(
                    plugin_code = %manifest.code,
                    type_name = %type_name,
                    "Service extension type is not registered, skipping"
                );
                report.missing_extensions.push(label);
                continue;
            };

            match services.register_extension(label.clone(), extension.as_ref()) {
                Ok(()) => {
                    debug!(plugin_code = %manifest.code, extension = %label, "Service extension registered");
                    report.extensions.push(label);
                }
                Err(e) => {
                    warn!(
                        plugin_code = %manifest.code,
                        extension = %label,
                        error = %e,
                        "Service extension failed to register"
                    );
                    report.failed_extensions.push(label);
                }
            }
        }
    }

    async fn attach_subscriber(
        &self,
        manifest: &Manifest,
        ctx: &PluginContext,
        resolver: &PriorityResolver,
        report: &mut LoadReport,
    ) {
        let resolved = resolver.resolve_manifest(manifest);

        let (attach, skip): (Vec<_>, Vec<_>) =
            resolved.into_iter().partition(|(_, p)| p.is_attached());
        report.skipped.extend(skip.into_iter().map(|(key, _)| key));

        if attach.is_empty() {
            return;
        }

        // Anything attached implies a declared subscriber type.
        let Some(type_name) = manifest.subscriber.as_deref() else {
            return;
        };

        let Some(subscriber) = self.factories.create_subscriber(type_name, ctx) else {
            warn!(
                plugin_code = %manifest.code,
                type_name = %type_name,
                "Subscriber type is not registered, skipping its bindings"
            );
            report
                .missing_subscribers
                .push(format!("{}::{}", manifest.code, type_name));
            return;
        };

        for (key, priority) in attach {
            let EffectivePriority::Attach(priority) = priority else {
                continue;
            };

            if !subscriber.handles(&key.method) {
                warn!(
                    plugin_code = %manifest.code,
                    event = %key.event,
                    method = %key.method,
                    "Subscriber does not expose handler method, skipping"
                );
                report.missing_handlers.push(key);
                continue;
            }

            self.registry
                .register(
                    &key.event,
                    SubscriberListener::wrap(&manifest.code, &key.method, subscriber.clone()),
                    priority,
                )
                .await;

            report.attached.push(AttachedListener {
                event: key.event,
                plugin_code: key.plugin_code,
                method: key.method,
                priority,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;

    use emporium_core::error::ErrorKind;
    use emporium_core::types::{ActivationRecord, EVENT_PRIORITY_LATEST, HandlerPriority};

    use super::*;
    use crate::activation::InMemoryActivationRegistry;
    use crate::hooks::definitions::HookEvent;
    use crate::services::ServiceExtension;
    use crate::traits::EventSubscriber;

    #[derive(Debug)]
    struct StaticProvider(BTreeMap<String, Manifest>);

    #[async_trait]
    impl ManifestProvider for StaticProvider {
        async fn get(&self) -> AppResult<BTreeMap<String, Manifest>> {
            Ok(self.0.clone())
        }

        async fn invalidate(&self) -> AppResult<()> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "static"
        }
    }

    #[derive(Debug)]
    struct Noop(&'static [&'static str]);

    #[async_trait]
    impl EventSubscriber for Noop {
        fn handles(&self, method: &str) -> bool {
            self.0.iter().any(|m| *m == method)
        }

        async fn call(&self, _method: &str, _event: &mut HookEvent) -> AppResult<()> {
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Marker;

    impl ServiceExtension for Marker {
        fn register(&self, container: &mut ServiceContainer) -> AppResult<()> {
            container.insert("loyalty.marker", true);
            Ok(())
        }
    }

    fn manifests() -> BTreeMap<String, Manifest> {
        let loyalty = Manifest::parse(
            "loyalty",
            "name: Loyalty\ncode: loyalty\nevent: LoyaltyEvent\nservice: [Marker, Ghost]\nconst:\n  rate: 5\norm.path: [/Resource/doctrine]\n",
            Some("order.completed:\n  - onOrderCompleted\n  - onMissing\nfront.request:\n  - onFrontRequest\n"),
        )
        .unwrap();
        BTreeMap::from([("loyalty".to_string(), loyalty)])
    }

    fn factories() -> Arc<PluginFactoryRegistry> {
        let mut factories = PluginFactoryRegistry::new();
        factories.register_subscriber("LoyaltyEvent", |_| {
            Arc::new(Noop(&["onOrderCompleted", "onFrontRequest"]))
        });
        factories.register_extension("Marker", |_| Arc::new(Marker));
        Arc::new(factories)
    }

    fn loader(
        registry: Arc<InMemoryActivationRegistry>,
        hooks: Arc<HookRegistry>,
        config: &PluginConfig,
    ) -> PluginLoader {
        PluginLoader::new(
            Arc::new(StaticProvider(manifests())),
            registry,
            factories(),
            hooks,
            config,
        )
    }

    #[tokio::test]
    async fn test_enabled_plugin_attaches_listeners() {
        let activations = Arc::new(InMemoryActivationRegistry::new());
        activations
            .insert_activation(ActivationRecord::enabled("loyalty", "LoyaltyEvent"))
            .await;
        activations
            .set_handler_priority("loyalty", "front.request", "onFrontRequest", HandlerPriority::Value(40))
            .await
            .unwrap();

        let hooks = Arc::new(HookRegistry::new());
        let loader = loader(activations, hooks.clone(), &PluginConfig::default());

        let mut settings = RuntimeSettings::new();
        let mut services = ServiceContainer::new();
        let report = loader.load_all(&mut settings, &mut services).await.unwrap();

        assert_eq!(report.plugins, vec!["loyalty"]);
        assert_eq!(report.attached.len(), 2);
        assert_eq!(report.attached[0].priority, EVENT_PRIORITY_LATEST);
        assert_eq!(report.attached[1].priority, 40);
        assert_eq!(report.missing_handlers.len(), 1);
        assert_eq!(report.missing_handlers[0].method, "onMissing");
        assert_eq!(report.extensions, vec!["loyalty::Marker"]);
        assert_eq!(report.missing_extensions, vec!["loyalty::Ghost"]);
        assert_eq!(
            report.mapping_paths,
            vec![PathBuf::from(&PluginConfig::default().directory).join("loyalty/Resource/doctrine")]
        );

        assert_eq!(hooks.listener_count("order.completed").await, 1);
        assert_eq!(hooks.describe("front.request").await[0].label, "loyalty::onFrontRequest");
        assert_eq!(settings.plugin_constant("loyalty", "rate"), Some(&serde_json::json!(5)));
        assert_eq!(services.get::<bool>("loyalty.marker").as_deref(), Some(&true));
    }

    #[tokio::test]
    async fn test_disabled_plugin_keeps_constants_and_extensions() {
        let activations = Arc::new(InMemoryActivationRegistry::new());
        activations
            .insert_activation(ActivationRecord::enabled("loyalty", "LoyaltyEvent").with_enabled(false))
            .await;

        let hooks = Arc::new(HookRegistry::new());
        let loader = loader(activations, hooks.clone(), &PluginConfig::default());

        let mut settings = RuntimeSettings::new();
        let mut services = ServiceContainer::new();
        let report = loader.load_all(&mut settings, &mut services).await.unwrap();

        assert!(report.attached.is_empty());
        assert_eq!(report.skipped.len(), 3);
        assert!(hooks.registered_events().await.is_empty());
        assert!(settings.has_plugin("loyalty"));
        assert!(services.contains("loyalty.marker"));
    }

    #[tokio::test]
    async fn test_extensions_can_require_enabled_plugin() {
        let activations = Arc::new(InMemoryActivationRegistry::new());
        activations
            .insert_activation(ActivationRecord::enabled("loyalty", "LoyaltyEvent").with_deleted(true))
            .await;

        let config = PluginConfig {
            extensions_require_enabled: true,
            ..PluginConfig::default()
        };
        let loader = loader(activations, Arc::new(HookRegistry::new()), &config);

        let mut settings = RuntimeSettings::new();
        let mut services = ServiceContainer::new();
        let report = loader.load_all(&mut settings, &mut services).await.unwrap();

        assert!(report.extensions.is_empty());
        assert!(services.is_empty());
        assert!(settings.has_plugin("loyalty"));
    }

    #[tokio::test]
    async fn test_second_load_is_refused_until_reload() {
        let activations = Arc::new(InMemoryActivationRegistry::new());
        activations
            .insert_activation(ActivationRecord::enabled("loyalty", "LoyaltyEvent"))
            .await;

        let hooks = Arc::new(HookRegistry::new());
        let loader = loader(activations, hooks.clone(), &PluginConfig::default());

        let mut settings = RuntimeSettings::new();
        let mut services = ServiceContainer::new();
        loader.load_all(&mut settings, &mut services).await.unwrap();

        let err = loader.load_all(&mut settings, &mut services).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Plugin);

        let report = loader.reload(&mut settings, &mut services).await.unwrap();
        assert_eq!(report.attached.len(), 2);
        assert_eq!(hooks.listener_count("order.completed").await, 1);
        assert!(loader.is_loaded());
    }

    #[tokio::test]
    async fn test_reload_replaces_plugin_state_in_reused_containers() {
        let activations = Arc::new(InMemoryActivationRegistry::new());
        activations
            .insert_activation(ActivationRecord::enabled("loyalty", "LoyaltyEvent"))
            .await;

        let loader = loader(activations, Arc::new(HookRegistry::new()), &PluginConfig::default());

        let mut settings = RuntimeSettings::new();
        let mut services = ServiceContainer::new();
        settings.insert("locale", serde_json::json!("ja"));
        services.insert("core.mailer", "smtp".to_string());
        loader.load_all(&mut settings, &mut services).await.unwrap();

        // A plugin that has since been removed from disk.
        let stale = BTreeMap::from([("x".to_string(), serde_json::json!(1))]);
        settings.merge_plugin_constants("retired", &stale);

        loader.reload(&mut settings, &mut services).await.unwrap();

        assert_eq!(services.providers(), ["loyalty::Marker"]);
        assert!(services.contains("loyalty.marker"));
        assert!(services.contains("core.mailer"));
        assert!(!settings.has_plugin("retired"));
        assert!(settings.has_plugin("loyalty"));
        assert_eq!(settings.get("locale"), Some(&serde_json::json!("ja")));
    }

    #[tokio::test]
    async fn test_plugin_without_constants_leaves_settings_untouched() {
        let coupon = Manifest::parse("coupon", "name: Coupon\ncode: coupon\n", None).unwrap();
        let loader = PluginLoader::new(
            Arc::new(StaticProvider(BTreeMap::from([("coupon".to_string(), coupon)]))),
            Arc::new(InMemoryActivationRegistry::new()),
            factories(),
            Arc::new(HookRegistry::new()),
            &PluginConfig::default(),
        );

        let mut settings = RuntimeSettings::new();
        settings.insert("coupon", serde_json::json!("core value"));
        let mut services = ServiceContainer::new();
        loader.load_all(&mut settings, &mut services).await.unwrap();

        assert_eq!(settings.get("coupon"), Some(&serde_json::json!("core value")));
    }

    #[tokio::test]
    async fn test_latest_handlers_keep_declaration_order() {
        let coupon = Manifest::parse(
            "coupon",
            "name: Coupon\ncode: coupon\nevent: CouponEvent\n",
            Some("cart.updated:\n  - onZeta\n  - onAlpha\n  - onMiddle\n"),
        )
        .unwrap();

        let mut factories = PluginFactoryRegistry::new();
        factories.register_subscriber("CouponEvent", |_| {
            Arc::new(Noop(&["onZeta", "onAlpha", "onMiddle"]))
        });

        let activations = Arc::new(InMemoryActivationRegistry::new());
        activations
            .insert_activation(ActivationRecord::enabled("coupon", "CouponEvent"))
            .await;

        let hooks = Arc::new(HookRegistry::new());
        let loader = PluginLoader::new(
            Arc::new(StaticProvider(BTreeMap::from([("coupon".to_string(), coupon)]))),
            activations,
            Arc::new(factories),
            hooks.clone(),
            &PluginConfig::default(),
        );

        let mut settings = RuntimeSettings::new();
        let mut services = ServiceContainer::new();
        loader.load_all(&mut settings, &mut services).await.unwrap();

        let labels: Vec<String> = hooks
            .describe("cart.updated")
            .await
            .into_iter()
            .map(|info| info.label)
            .collect();
        assert_eq!(
            labels,
            vec!["coupon::onZeta", "coupon::onAlpha", "coupon::onMiddle"]
        );
    }

    #[tokio::test]
    async fn test_unregistered_subscriber_type() {
        let activations = Arc::new(InMemoryActivationRegistry::new());
        activations
            .insert_activation(ActivationRecord::enabled("loyalty", "LoyaltyEvent"))
            .await;

        let loader = PluginLoader::new(
            Arc::new(StaticProvider(manifests())),
            activations,
            Arc::new(PluginFactoryRegistry::new()),
            Arc::new(HookRegistry::new()),
            &PluginConfig::default(),
        );

        let mut settings = RuntimeSettings::new();
        let mut services = ServiceContainer::new();
        let report = loader.load_all(&mut settings, &mut services).await.unwrap();

        assert!(report.attached.is_empty());
        assert_eq!(report.missing_subscribers, vec!["loyalty::LoyaltyEvent"]);
        assert_eq!(report.missing_extensions.len(), 2);
    }
}
