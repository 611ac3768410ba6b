//! # Aula Library
//!
//! This library exposes the Aula front-end modules for testing.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod cli;
pub mod config;
pub mod error;
pub mod store;

// Re-export the inner crates for convenience
pub use aula_core;
pub use aula_sdk;
