//! Output store interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outcache_core::{OutcacheError, OutcacheResult};

/// A value held by an output store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    /// Response payload bytes.
    Bytes(Vec<u8>),
    /// UTF-8 text, used for metadata JSON and the group sentinel.
    Text(String),
}

impl StoredValue {
    /// The empty text value marking a group base key.
    #[must_use]
    pub fn sentinel() -> Self {
        Self::Text(String::new())
    }

    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }

    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Bytes(_) => ValueKind::Bytes,
            Self::Text(_) => ValueKind::Text,
        }
    }

    /// Consumes the value, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Bytes(bytes) => bytes,
            Self::Text(text) => text.into_bytes(),
        }
    }
}

impl From<Vec<u8>> for StoredValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<String> for StoredValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Declared kind of a value being read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bytes,
    Text,
}

/// Storage for cached responses.
///
/// Keys are always exact, except that a key containing `*` passed to
/// [`remove_group`](Self::remove_group) is a glob pattern. Misses are never
/// errors; errors mean the backend itself failed.
#[async_trait]
pub trait OutputStore: Send + Sync {
    /// Checks if a live entry exists under exactly `key`.
    async fn contains(&self, key: &str) -> OutcacheResult<bool>;

    /// Reads the value stored under `key`.
    async fn get(&self, key: &str, kind: ValueKind) -> OutcacheResult<Option<StoredValue>>;

    /// Stores a value until `expires_at`, optionally linked into a group.
    ///
    /// Adding [`StoredValue::sentinel`] under a base key declares the group.
    async fn add(
        &self,
        key: &str,
        value: StoredValue,
        expires_at: DateTime<Utc>,
        group_key: Option<&str>,
    ) -> OutcacheResult<()>;

    /// Removes one entry. Removing a missing key is a no-op.
    async fn remove(&self, key: &str) -> OutcacheResult<()>;

    /// Removes every member of a group and the group's sentinel, or every
    /// key matching a pattern. Returns the number of keys removed.
    async fn remove_group(&self, key: &str) -> OutcacheResult<u64>;

    /// Drops expired entries. Backends that expire on their own return 0.
    async fn purge_expired(&self) -> OutcacheResult<u64> {
        Ok(0)
    }

    /// Backend name for logs and metrics.
    fn backend(&self) -> &'static str;
}

/// Extension trait with typed reads.
#[async_trait]
pub trait OutputStoreExt: OutputStore {
    /// Reads a payload.
    async fn get_bytes(&self, key: &str) -> OutcacheResult<Option<Vec<u8>>> {
        Ok(self
            .get(key, ValueKind::Bytes)
            .await?
            .map(StoredValue::into_bytes))
    }

    /// Reads and deserializes a JSON text value.
    async fn get_json<T: serde::de::DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> OutcacheResult<Option<T>> {
        match self.get(key, ValueKind::Text).await? {
            Some(StoredValue::Text(json)) => Ok(Some(serde_json::from_str(&json)?)),
            Some(StoredValue::Bytes(_)) => Err(OutcacheError::Serialization(format!(
                "key '{}' holds bytes, expected JSON text",
                key
            ))),
            None => Ok(None),
        }
    }

    /// Serializes a value as JSON text and stores it.
    async fn add_json<T: serde::Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        expires_at: DateTime<Utc>,
        group_key: Option<&str>,
    ) -> OutcacheResult<()> {
        let json = serde_json::to_string(value)?;
        self.add(key, StoredValue::Text(json), expires_at, group_key)
            .await
    }
}

// Blanket implementation for all OutputStore implementations
impl<T: OutputStore + ?Sized> OutputStoreExt for T {}
