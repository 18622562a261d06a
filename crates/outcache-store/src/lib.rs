//! # Outcache Store
//!
//! Storage for cached responses.
//!
//! [`OutputStore`] is the seam between the HTTP layer and the backends:
//! [`LocalOutputStore`] keeps entries in process, [`RedisOutputStore`] shares
//! them through Redis.

pub mod compression;
pub mod glob;
mod local;
pub mod pool;
mod redis_store;
mod store;
pub mod sweeper;
pub mod timeout;

pub use compression::PayloadCodec;
pub use local::LocalOutputStore;
pub use redis_store::RedisOutputStore;
pub use store::{OutputStore, OutputStoreExt, StoredValue, ValueKind};
