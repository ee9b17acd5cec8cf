//! Hook dispatcher: invokes the listeners of one event name in priority order.
//!
//! - Listeners run sequentially, highest priority first.
//! - A listener may stop propagation; the rest of that event's listeners are skipped.
//! - A listener error aborts the dispatch and is returned to the caller unchanged.
//!   Whether to swallow it is the caller's decision.

use std::sync::Arc;

use tracing::{debug, error};

use emporium_core::result::AppResult;

use super::definitions::HookEvent;
use super::registry::HookRegistry;

/// Outcome of dispatching one event name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    /// Event name that was dispatched.
    pub hook: String,
    /// Number of listeners invoked.
    pub invoked: usize,
    /// Whether a listener stopped propagation.
    pub propagation_stopped: bool,
}

/// Dispatches events to all registered listeners.
#[derive(Debug, Clone)]
pub struct HookDispatcher {
    /// Hook registry.
    registry: Arc<HookRegistry>,
}

impl HookDispatcher {
    /// Creates a new dispatcher over a registry.
    pub fn new(registry: Arc<HookRegistry>) -> Self {
        Self { registry }
    }

    /// Dispatches `name` to its listeners.
    ///
    /// The listener list is snapshotted before the first listener runs, so
    /// no registry lock is held while listeners execute.
    pub async fn dispatch(&self, name: &str, event: &mut HookEvent) -> AppResult<DispatchResult> {
        event.begin(name);

        let listeners = self.registry.get_listeners(name).await;

        let mut result = DispatchResult {
            hook: name.to_string(),
            invoked: 0,
            propagation_stopped: false,
        };

        if listeners.is_empty() {
            debug!(hook = %name, "Dispatching hook point without listeners");
            return Ok(result);
        }

        debug!(
            hook = %name,
            listener_count = listeners.len(),
            "Dispatching hook point"
        );

        for listener in &listeners {
            if event.is_propagation_stopped() {
                debug!(
                    hook = %name,
                    skipped = listeners.len() - result.invoked,
                    "Propagation stopped"
                );
                result.propagation_stopped = true;
                break;
            }

            if let Err(e) = listener.handle(event).await {
                error!(
                    hook = %name,
                    plugin_id = %listener.plugin_id(),
                    listener = %listener.label(),
                    error = %e,
                    "Listener failed"
                );
                return Err(e);
            }

            result.invoked += 1;
        }

        if event.is_propagation_stopped() {
            result.propagation_stopped = true;
        }

        Ok(result)
    }

    /// Returns a reference to the hook registry.
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use emporium_core::error::{AppError, ErrorKind};

    use super::*;
    use crate::traits::ClosureListener;

    fn recorder(
        plugin: &str,
        log: &Arc<Mutex<Vec<String>>>,
    ) -> Arc<ClosureListener> {
        let log = log.clone();
        let tag = plugin.to_string();
        Arc::new(ClosureListener::new(plugin, move |event| {
            log.lock().unwrap().push(format!("{}@{}", tag, event.name));
            Ok(())
        }))
    }

    #[tokio::test]
    async fn test_runs_in_priority_order() {
        let registry = Arc::new(HookRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.register("global.request", recorder("late", &log), -500).await;
        registry.register("global.request", recorder("early", &log), 200).await;

        let dispatcher = HookDispatcher::new(registry);
        let mut event = HookEvent::new();
        let result = dispatcher.dispatch("global.request", &mut event).await.unwrap();

        assert_eq!(result.invoked, 2);
        assert!(!result.propagation_stopped);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["early@global.request", "late@global.request"]
        );
    }

    #[tokio::test]
    async fn test_listeners_see_earlier_modifications() {
        let registry = Arc::new(HookRegistry::new());
        registry
            .register(
                "front.response",
                Arc::new(ClosureListener::new("first", |event| {
                    event.set("banner", json!("sale"));
                    Ok(())
                })),
                10,
            )
            .await;
        registry
            .register(
                "front.response",
                Arc::new(ClosureListener::new("second", |event| {
                    let banner = event.get_string("banner").unwrap_or_default().to_uppercase();
                    event.set("banner", json!(banner));
                    Ok(())
                })),
                5,
            )
            .await;

        let dispatcher = HookDispatcher::new(registry);
        let mut event = HookEvent::new();
        dispatcher.dispatch("front.response", &mut event).await.unwrap();

        assert_eq!(event.get_string("banner"), Some("SALE"));
    }

    #[tokio::test]
    async fn test_stop_propagation_skips_remaining_listeners() {
        let registry = Arc::new(HookRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        registry
            .register(
                "admin.request",
                Arc::new(ClosureListener::new("guard", |event| {
                    event.stop_propagation();
                    Ok(())
                })),
                100,
            )
            .await;
        registry.register("admin.request", recorder("never", &log), 0).await;

        let dispatcher = HookDispatcher::new(registry);
        let mut event = HookEvent::new();
        let result = dispatcher.dispatch("admin.request", &mut event).await.unwrap();

        assert_eq!(result.invoked, 1);
        assert!(result.propagation_stopped);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listener_error_propagates_and_stops() {
        let registry = Arc::new(HookRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        registry
            .register(
                "global.exception",
                Arc::new(ClosureListener::new("broken", |_| {
                    Err(AppError::plugin("boom"))
                })),
                10,
            )
            .await;
        registry.register("global.exception", recorder("after", &log), 0).await;

        let dispatcher = HookDispatcher::new(registry);
        let mut event = HookEvent::new();
        let err = dispatcher
            .dispatch("global.exception", &mut event)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Plugin);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_without_listeners() {
        let dispatcher = HookDispatcher::new(Arc::new(HookRegistry::new()));
        let mut event = HookEvent::new();
        let result = dispatcher.dispatch("nobody.listens", &mut event).await.unwrap();
        assert_eq!(result.invoked, 0);
        assert_eq!(event.name, "nobody.listens");
    }
}
