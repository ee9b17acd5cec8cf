//! Prelude for plugin authors.

pub use async_trait::async_trait;

pub use emporium_core::error::AppError;
pub use emporium_core::result::AppResult;

pub use crate::factory::{PluginContext, PluginFactoryRegistry};
pub use crate::hooks::definitions::HookEvent;
pub use crate::services::{ServiceContainer, ServiceExtension};
pub use crate::traits::EventSubscriber;
