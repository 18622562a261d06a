//! # Outcache Core
//!
//! Core types for the Outcache HTTP output cache.
//! This crate holds the pure parts of the cache engine: error definitions,
//! cache-key derivation, freshness policies and the metadata stored next to
//! every cached payload.

pub mod error;
pub mod freshness;
pub mod keys;
pub mod logging;
pub mod metadata;
pub mod result;

pub use error::*;
pub use freshness::*;
pub use keys::*;
pub use metadata::*;
pub use result::*;
