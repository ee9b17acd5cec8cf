//! # emporium-core
//!
//! Core crate for the Emporium plugin runtime. Contains configuration
//! schemas, plugin activation types, the activation registry trait,
//! the runtime settings map plugins publish constants into, and the
//! unified error system.
//!
//! This crate has **no** internal dependencies on other Emporium crates.

pub mod config;
pub mod error;
pub mod result;
pub mod settings;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
pub use settings::RuntimeSettings;
