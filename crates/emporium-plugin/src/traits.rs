//! Traits implemented by plugin code, and the adapters that attach them to the hook registry.

use std::sync::Arc;

use async_trait::async_trait;

use emporium_core::result::AppResult;

use crate::hooks::definitions::HookEvent;
use crate::hooks::registry::HookListener;

/// A plugin's event subscriber: one object exposing named handler methods.
///
/// Manifests bind event names to method names; the loader checks
/// [`handles`](Self::handles) before attaching a method, and the dispatcher
/// reaches the method through [`call`](Self::call).
#[async_trait]
pub trait EventSubscriber: Send + Sync + std::fmt::Debug {
    /// Whether the subscriber exposes a handler method with this name.
    fn handles(&self, method: &str) -> bool;

    /// Invokes a handler method.
    async fn call(&self, method: &str, event: &mut HookEvent) -> AppResult<()>;
}

/// Adapts one method of an [`EventSubscriber`] to the [`HookListener`] trait.
#[derive(Debug)]
pub struct SubscriberListener {
    plugin_code: String,
    method: String,
    subscriber: Arc<dyn EventSubscriber>,
}

impl SubscriberListener {
    /// Creates a listener bound to `method` of `subscriber`.
    pub fn new(
        plugin_code: impl Into<String>,
        method: impl Into<String>,
        subscriber: Arc<dyn EventSubscriber>,
    ) -> Self {
        Self {
            plugin_code: plugin_code.into(),
            method: method.into(),
            subscriber,
        }
    }

    /// Wraps the adapter into an `Arc<dyn HookListener>`.
    pub fn wrap(
        plugin_code: impl Into<String>,
        method: impl Into<String>,
        subscriber: Arc<dyn EventSubscriber>,
    ) -> Arc<dyn HookListener> {
        Arc::new(Self::new(plugin_code, method, subscriber))
    }

    /// The bound method name.
    pub fn method(&self) -> &str {
        &self.method
    }
}

#[async_trait]
impl HookListener for SubscriberListener {
    async fn handle(&self, event: &mut HookEvent) -> AppResult<()> {
        self.subscriber.call(&self.method, event).await
    }

    fn plugin_id(&self) -> &str {
        &self.plugin_code
    }

    fn label(&self) -> String {
        format!("{}::{}", self.plugin_code, self.method)
    }
}

type ListenerFn = dyn Fn(&mut HookEvent) -> AppResult<()> + Send + Sync;

/// A closure-based listener, used by the core for quick registrations.
pub struct ClosureListener {
    id: String,
    handler: Arc<ListenerFn>,
}

impl std::fmt::Debug for ClosureListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureListener")
            .field("id", &self.id)
            .field("handler", &"<closure>")
            .finish()
    }
}

impl ClosureListener {
    /// Creates a new closure-based listener owned by `plugin_id`.
    pub fn new<F>(plugin_id: &str, handler: F) -> Self
    where
        F: Fn(&mut HookEvent) -> AppResult<()> + Send + Sync + 'static,
    {
        Self {
            id: plugin_id.to_string(),
            handler: Arc::new(handler),
        }
    }
}

#[async_trait]
impl HookListener for ClosureListener {
    async fn handle(&self, event: &mut HookEvent) -> AppResult<()> {
        (self.handler)(event)
    }

    fn plugin_id(&self) -> &str {
        &self.id
    }
}
