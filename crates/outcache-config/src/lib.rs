//! # Outcache Config
//!
//! Configuration management for the Outcache output cache.
//! Layered configuration from TOML files and environment variables,
//! validated at load time.

mod app_config;
mod loader;

pub use app_config::*;
pub use loader::*;
