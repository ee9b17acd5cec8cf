//! Core traits defined in `emporium-core` and implemented by other crates.

pub mod activation;

pub use activation::ActivationRegistry;
