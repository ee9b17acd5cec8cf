//! Manifest providers: where the loader gets the aggregate manifest map from.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use emporium_core::config::PluginConfig;
use emporium_core::result::AppResult;

use crate::cache::CachedManifestProvider;
use crate::manifest::Manifest;
use crate::store::ManifestStore;

/// Source of the manifests of every installed plugin, keyed by code.
#[async_trait]
pub trait ManifestProvider: Send + Sync + std::fmt::Debug {
    /// Returns all manifests.
    async fn get(&self) -> AppResult<BTreeMap<String, Manifest>>;

    /// Drops anything memoized so the next `get` reflects the filesystem.
    async fn invalidate(&self) -> AppResult<()>;

    /// Short name for logs and status output.
    fn name(&self) -> &'static str;
}

/// Development provider: reads the plugin directory on every call.
#[derive(Debug, Clone)]
pub struct DirectManifestProvider {
    store: ManifestStore,
}

impl DirectManifestProvider {
    /// Creates a provider over a store.
    pub fn new(store: ManifestStore) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &ManifestStore {
        &self.store
    }
}

#[async_trait]
impl ManifestProvider for DirectManifestProvider {
    async fn get(&self) -> AppResult<BTreeMap<String, Manifest>> {
        self.store.discover_all().await
    }

    async fn invalidate(&self) -> AppResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

/// Builds the provider selected by configuration.
///
/// Development mode reads manifests directly; otherwise the compiled cache
/// artifact under `cache_dir` is used.
pub fn manifest_provider(config: &PluginConfig) -> Arc<dyn ManifestProvider> {
    let direct = DirectManifestProvider::new(ManifestStore::new(&config.directory));

    if config.debug {
        info!(directory = %config.directory, "Using direct manifest provider");
        Arc::new(direct)
    } else {
        info!(
            directory = %config.directory,
            cache_dir = %config.cache_dir,
            "Using cached manifest provider"
        );
        Arc::new(CachedManifestProvider::new(
            Arc::new(direct),
            PathBuf::from(&config.cache_dir),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_selects_direct_provider() {
        let config = PluginConfig {
            debug: true,
            ..PluginConfig::default()
        };
        assert_eq!(manifest_provider(&config).name(), "direct");
    }

    #[test]
    fn test_production_selects_cached_provider() {
        let config = PluginConfig::default();
        assert_eq!(manifest_provider(&config).name(), "cached");
    }
}
