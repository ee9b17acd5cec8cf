//! Read-only access to persisted plugin activation state.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::activation::{ActivationRecord, HandlerRecord};

/// Source of plugin activation records and handler priority overrides.
///
/// Writes (install, enable, disable, priority edits) happen elsewhere; any
/// such write must be followed by invalidating the plugin config cache.
#[async_trait]
pub trait ActivationRegistry: Send + Sync + std::fmt::Debug + 'static {
    /// Lists every handler override across all plugins, ordered by plugin
    /// code, event, descending priority, then handler name.
    async fn list_handler_records(&self) -> AppResult<Vec<HandlerRecord>>;

    /// Returns the activation record of one plugin.
    async fn get_activation(&self, code: &str) -> AppResult<Option<ActivationRecord>>;

    /// Lists the activation records of all installed plugins.
    async fn list_activations(&self) -> AppResult<Vec<ActivationRecord>>;
}
