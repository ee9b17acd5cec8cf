//! Plugin runtime: owns the hook registry, dispatcher, cascade and loader.

use std::sync::Arc;

use tracing::info;

use emporium_core::config::PluginConfig;
use emporium_core::result::AppResult;
use emporium_core::settings::RuntimeSettings;
use emporium_core::traits::ActivationRegistry;

use crate::factory::PluginFactoryRegistry;
use crate::hooks::cascade::HookCascade;
use crate::hooks::dispatcher::HookDispatcher;
use crate::hooks::registry::{HookListener, HookRegistry};
use crate::loader::{LoadReport, PluginLoader};
use crate::provider::{ManifestProvider, manifest_provider};
use crate::services::ServiceContainer;

/// Everything the application needs to load plugins and fire hook points.
///
/// Built once at startup and shared as an `Arc`.
#[derive(Debug)]
pub struct PluginRuntime {
    provider: Arc<dyn ManifestProvider>,
    hook_registry: Arc<HookRegistry>,
    dispatcher: Arc<HookDispatcher>,
    cascade: HookCascade,
    loader: PluginLoader,
}

impl PluginRuntime {
    /// Creates a runtime using the manifest provider selected by `config`.
    pub fn new(
        config: &PluginConfig,
        activations: Arc<dyn ActivationRegistry>,
        factories: PluginFactoryRegistry,
    ) -> Self {
        Self::with_provider(manifest_provider(config), activations, factories, config)
    }

    /// Creates a runtime over an explicit manifest provider.
    pub fn with_provider(
        provider: Arc<dyn ManifestProvider>,
        activations: Arc<dyn ActivationRegistry>,
        factories: PluginFactoryRegistry,
        config: &PluginConfig,
    ) -> Self {
        let hook_registry = Arc::new(HookRegistry::new());
        let dispatcher = Arc::new(HookDispatcher::new(hook_registry.clone()));
        let cascade = HookCascade::new(dispatcher.clone());
        let loader = PluginLoader::new(
            provider.clone(),
            activations,
            Arc::new(factories),
            hook_registry.clone(),
            config,
        );

        Self {
            provider,
            hook_registry,
            dispatcher,
            cascade,
            loader,
        }
    }

    /// Loads all plugins. Must complete before the first request is handled.
    pub async fn load(
        &self,
        settings: &mut RuntimeSettings,
        services: &mut ServiceContainer,
    ) -> AppResult<LoadReport> {
        self.loader.load_all(settings, services).await
    }

    /// Invalidates the manifest cache and loads all plugins again.
    ///
    /// Call after installing, removing, enabling or disabling a plugin, or
    /// after editing handler priorities.
    pub async fn reload(
        &self,
        settings: &mut RuntimeSettings,
        services: &mut ServiceContainer,
    ) -> AppResult<LoadReport> {
        self.provider.invalidate().await?;
        let report = self.loader.reload(settings, services).await?;
        info!(attached = report.attached.len(), "Plugin runtime reloaded");
        Ok(report)
    }

    /// Drops the compiled manifest cache.
    pub async fn invalidate_cache(&self) -> AppResult<()> {
        self.provider.invalidate().await
    }

    /// Attaches a listener owned by the core rather than by a plugin.
    ///
    /// Core listeners are dropped by `reload` like every other registration.
    pub async fn register_listener(
        &self,
        event: &str,
        listener: Arc<dyn HookListener>,
        priority: i32,
    ) {
        self.hook_registry.register(event, listener, priority).await;
    }

    /// Returns the hook cascade driven by the HTTP kernel.
    pub fn cascade(&self) -> &HookCascade {
        &self.cascade
    }

    /// Returns the hook dispatcher for firing individual events.
    pub fn dispatcher(&self) -> &Arc<HookDispatcher> {
        &self.dispatcher
    }

    /// Returns the hook registry.
    pub fn hook_registry(&self) -> &Arc<HookRegistry> {
        &self.hook_registry
    }

    /// Returns the manifest provider.
    pub fn provider(&self) -> &Arc<dyn ManifestProvider> {
        &self.provider
    }

    /// Whether plugins have been loaded.
    pub fn is_loaded(&self) -> bool {
        self.loader.is_loaded()
    }
}
