//! Service extensions and the container they register into.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use emporium_core::result::AppResult;

/// A plugin-provided service extension.
///
/// Extensions add services to the [`ServiceContainer`] while plugins load.
pub trait ServiceExtension: Send + Sync + std::fmt::Debug {
    /// Registers services.
    fn register(&self, container: &mut ServiceContainer) -> AppResult<()>;
}

/// Named services shared between the core and plugins.
#[derive(Default)]
pub struct ServiceContainer {
    services: BTreeMap<String, Arc<dyn Any + Send + Sync>>,
    providers: Vec<String>,
    extension_services: BTreeSet<String>,
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("services", &self.services.keys().collect::<Vec<_>>())
            .field("providers", &self.providers)
            .field("extension_services", &self.extension_services)
            .finish()
    }
}

impl ServiceContainer {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a service under `name`, replacing any previous one.
    pub fn insert<T>(&mut self, name: impl Into<String>, service: T)
    where
        T: Any + Send + Sync,
    {
        self.services.insert(name.into(), Arc::new(service));
    }

    /// Returns a service if it exists and has type `T`.
    pub fn get<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.services.get(name).cloned()?.downcast::<T>().ok()
    }

    /// Whether a service is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Registered service names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.services.keys().map(String::as_str).collect()
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether the container is empty.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Runs an extension and remembers it under `label`.
    pub fn register_extension(
        &mut self,
        label: impl Into<String>,
        extension: &dyn ServiceExtension,
    ) -> AppResult<()> {
        let before: BTreeSet<String> = self.services.keys().cloned().collect();
        extension.register(self)?;
        let added: Vec<String> = self
            .services
            .keys()
            .filter(|name| !before.contains(*name))
            .cloned()
            .collect();
        self.extension_services.extend(added);
        self.providers.push(label.into());
        Ok(())
    }

    /// Drops every service added by an extension and forgets the extensions.
    ///
    /// Services inserted directly with [`insert`](Self::insert) are kept.
    pub fn clear_extensions(&mut self) {
        for name in std::mem::take(&mut self.extension_services) {
            self.services.remove(&name);
        }
        self.providers.clear();
    }

    /// Labels of the extensions registered so far, in registration order.
    pub fn providers(&self) -> &[String] {
        &self.providers
    }
}
