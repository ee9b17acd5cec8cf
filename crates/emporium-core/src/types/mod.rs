//! Shared value types.

pub mod activation;

pub use activation::{
    ActivationRecord, EVENT_PRIORITY_DISABLED, EVENT_PRIORITY_LATEST, HandlerPriority,
    HandlerRecord,
};
