//! # emporium-database
//!
//! PostgreSQL connection management, migrations, and the persisted
//! plugin activation registry.

pub mod connection;
pub mod migration;
pub mod models;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::{PgActivationRegistry, PluginRepository};
