//! Row types of the plugin tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use emporium_core::types::{ActivationRecord, HandlerPriority, HandlerRecord};

/// A row of `plugins`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PluginRow {
    /// Primary key.
    pub id: Uuid,
    /// Plugin code (directory name).
    pub code: String,
    /// Display name.
    pub name: String,
    /// Subscriber class name.
    pub class_name: String,
    /// Installed version.
    pub version: String,
    /// Enabled flag.
    pub enabled: bool,
    /// Soft-delete flag.
    pub del_flg: bool,
    /// When the plugin was installed.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

impl From<PluginRow> for ActivationRecord {
    fn from(row: PluginRow) -> Self {
        Self {
            code: row.code,
            class_name: row.class_name,
            enabled: row.enabled,
            deleted: row.del_flg,
        }
    }
}

/// A row of `plugin_event_handlers` joined with its plugin code.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HandlerRow {
    /// Code of the owning plugin.
    pub plugin_code: String,
    /// Event name.
    pub event: String,
    /// Handler method name.
    pub handler: String,
    /// Stored priority; `0` disables the handler.
    pub priority: i32,
}

impl From<HandlerRow> for HandlerRecord {
    fn from(row: HandlerRow) -> Self {
        Self {
            plugin_code: row.plugin_code,
            event: row.event,
            handler: row.handler,
            priority: HandlerPriority::from_stored(row.priority),
        }
    }
}
