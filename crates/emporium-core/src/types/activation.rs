//! Persisted plugin activation state and handler priority overrides.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Effective priority for bindings that have no persisted override.
///
/// Lower than any explicitly configured priority, so newly introduced
/// handlers run after every administrator-tuned one.
pub const EVENT_PRIORITY_LATEST: i32 = -500;

/// Stored priority value meaning "do not attach this handler".
pub const EVENT_PRIORITY_DISABLED: i32 = 0;

/// Lifecycle state of an installed plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRecord {
    /// Plugin code (directory name).
    pub code: String,
    /// Subscriber type name; overrides apply only when it matches the manifest.
    pub class_name: String,
    /// Whether the plugin is enabled.
    pub enabled: bool,
    /// Whether the plugin is soft-deleted.
    pub deleted: bool,
}

impl ActivationRecord {
    /// Creates an enabled, non-deleted record.
    pub fn enabled(code: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            class_name: class_name.into(),
            enabled: true,
            deleted: false,
        }
    }

    /// Returns the record with its enabled flag set.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns the record with its soft-delete flag set.
    pub fn with_deleted(mut self, deleted: bool) -> Self {
        self.deleted = deleted;
        self
    }

    /// Whether handlers of this plugin may be attached at all.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.deleted
    }
}

/// A handler priority override as seen by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerPriority {
    /// The handler must not be attached.
    Disabled,
    /// The handler is attached with this priority (higher runs earlier).
    Value(i32),
}

impl HandlerPriority {
    /// Decodes the stored integer form, where `0` is the disabled sentinel.
    pub fn from_stored(priority: i32) -> Self {
        if priority == EVENT_PRIORITY_DISABLED {
            Self::Disabled
        } else {
            Self::Value(priority)
        }
    }

    /// Encodes back into the stored integer form.
    pub fn to_stored(self) -> i32 {
        match self {
            Self::Disabled => EVENT_PRIORITY_DISABLED,
            Self::Value(p) => p,
        }
    }
}

impl fmt::Display for HandlerPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Value(p) => write!(f, "{p}"),
        }
    }
}

/// One persisted handler row: a plugin's override for one event binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerRecord {
    /// Code of the plugin owning the handler.
    pub plugin_code: String,
    /// Event name the handler is bound to.
    pub event: String,
    /// Handler method name.
    pub handler: String,
    /// Configured priority.
    pub priority: HandlerPriority,
}

impl HandlerRecord {
    /// Creates a handler record.
    pub fn new(
        plugin_code: impl Into<String>,
        event: impl Into<String>,
        handler: impl Into<String>,
        priority: HandlerPriority,
    ) -> Self {
        Self {
            plugin_code: plugin_code.into(),
            event: event.into(),
            handler: handler.into(),
            priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_decodes_as_disabled() {
        assert_eq!(HandlerPriority::from_stored(0), HandlerPriority::Disabled);
        assert_eq!(HandlerPriority::from_stored(-1), HandlerPriority::Value(-1));
        assert_eq!(HandlerPriority::Disabled.to_stored(), EVENT_PRIORITY_DISABLED);
    }

    #[test]
    fn test_is_active() {
        let record = ActivationRecord::enabled("loyalty", "LoyaltyEvent");
        assert!(record.is_active());
        assert!(!record.clone().with_enabled(false).is_active());
        assert!(!record.with_deleted(true).is_active());
    }
}
