//! # emporium-plugin
//!
//! Plugin extension runtime for Emporium. Provides:
//!
//! - Manifest discovery from plugin directories (`config.yml`, `event.yml`)
//! - A compiled manifest cache for production, bypassed in development
//! - Priority resolution against persisted handler overrides
//! - Hook registry and dispatcher with descending-priority ordering
//! - The lifecycle cascade that maps kernel phases onto hook points
//! - The loader that attaches plugin subscribers and service extensions

pub mod activation;
pub mod cache;
pub mod factory;
pub mod hooks;
pub mod loader;
pub mod manager;
pub mod manifest;
pub mod prelude;
pub mod priority;
pub mod provider;
pub mod services;
pub mod store;
pub mod traits;

pub use activation::InMemoryActivationRegistry;
pub use cache::CachedManifestProvider;
pub use factory::{PluginContext, PluginFactoryRegistry};
pub use hooks::{HookCascade, HookDispatcher, HookEvent, HookRegistry, RouteTable};
pub use loader::{LoadReport, PluginLoader};
pub use manager::PluginRuntime;
pub use manifest::Manifest;
pub use priority::{EffectivePriority, PriorityResolver};
pub use provider::{DirectManifestProvider, ManifestProvider, manifest_provider};
pub use store::ManifestStore;
