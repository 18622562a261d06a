//! Redis-backed output store.

use crate::timeout::with_timeout;
use crate::{OutputStore, PayloadCodec, StoredValue, ValueKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_redis::{
    redis::{cmd, AsyncCommands, Cmd},
    Pool,
};
use outcache_config::RedisConfig;
use outcache_core::{is_pattern, OutcacheError, OutcacheResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default deadline for a single store call.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(500);

/// Keys requested per `SCAN` page and deleted per `DEL`.
pub const SCAN_COUNT: usize = 500;

/// Output store backed by Redis.
///
/// Layout: the base key is a Redis set holding the keys of every cached
/// variant, payloads live under the cache key and metadata JSON under
/// `cacheKey:meta`. Group membership is written after the value and is not
/// atomic with it.
pub struct RedisOutputStore {
    pool: Arc<Pool>,
    codec: PayloadCodec,
    command_timeout: Duration,
}

impl RedisOutputStore {
    /// Create a new Redis output store.
    #[must_use]
    pub fn new(pool: Arc<Pool>) -> Self {
        Self {
            pool,
            codec: PayloadCodec::default(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Create a store with codec and timeout taken from configuration.
    #[must_use]
    pub fn from_config(pool: Arc<Pool>, config: &RedisConfig) -> Self {
        Self {
            pool,
            codec: PayloadCodec::from_config(config),
            command_timeout: config.command_timeout(),
        }
    }

    #[must_use]
    pub fn with_codec(mut self, codec: PayloadCodec) -> Self {
        self.codec = codec;
        self
    }

    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> OutcacheResult<deadpool_redis::Connection> {
        self.pool.get().await.map_err(|e| {
            OutcacheError::store_unavailable(format!("Failed to get Redis connection: {}", e))
        })
    }

    /// Runs one round-trip under the command timeout.
    async fn round_trip<T, Fut>(&self, call: Fut) -> OutcacheResult<T>
    where
        Fut: Future<Output = OutcacheResult<T>>,
    {
        with_timeout(self.command_timeout, || call).await
    }

    /// Deletes `keys` in batches of [`SCAN_COUNT`], one round-trip each.
    async fn delete_keys(
        &self,
        conn: &mut deadpool_redis::Connection,
        keys: &[String],
    ) -> OutcacheResult<u64> {
        let mut deleted = 0;
        for batch in keys.chunks(SCAN_COUNT) {
            deleted += self
                .round_trip(async {
                    let removed: u64 = conn.del(batch).await.map_err(|e| {
                        OutcacheError::store_unavailable(format!("Failed to delete keys: {}", e))
                    })?;
                    Ok(removed)
                })
                .await?;
        }
        Ok(deleted)
    }

    /// Scans for `pattern` and deletes each page of matches as it arrives.
    ///
    /// Every `SCAN` page and every `DEL` gets its own deadline, so a large
    /// keyspace costs more round-trips instead of timing out. A key returned
    /// twice by `SCAN` is deleted once; the second `DEL` counts zero.
    async fn remove_matching(&self, pattern: &str) -> OutcacheResult<u64> {
        let mut conn = self.round_trip(self.get_conn()).await?;
        let mut cursor = 0u64;
        let mut deleted = 0u64;
        let mut pages = 0u32;

        loop {
            let (next, keys): (u64, Vec<String>) = self
                .round_trip(async {
                    let page = scan_command(cursor, pattern)
                        .query_async(&mut conn)
                        .await
                        .map_err(|e| {
                            OutcacheError::store_unavailable(format!(
                                "Failed to scan '{}': {}",
                                pattern, e
                            ))
                        })?;
                    Ok(page)
                })
                .await?;

            deleted += self.delete_keys(&mut conn, &keys).await?;
            pages += 1;
            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(pattern, deleted, pages, "Deleted keys matching pattern");
        Ok(deleted)
    }
}

/// Builds one `SCAN cursor MATCH pattern COUNT n` page request.
fn scan_command(cursor: u64, pattern: &str) -> Cmd {
    let mut command = cmd("SCAN");
    command
        .arg(cursor)
        .arg("MATCH")
        .arg(pattern)
        .arg("COUNT")
        .arg(SCAN_COUNT);
    command
}

impl std::fmt::Debug for RedisOutputStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("RedisOutputStore")
            .field("pool_size", &status.size)
            .field("available", &status.available)
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

#[async_trait]
impl OutputStore for RedisOutputStore {
    async fn contains(&self, key: &str) -> OutcacheResult<bool> {
        with_timeout(self.command_timeout, || async {
            let mut conn = self.get_conn().await?;
            let exists: bool = conn.exists(key).await?;
            Ok(exists)
        })
        .await
    }

    async fn get(&self, key: &str, kind: ValueKind) -> OutcacheResult<Option<StoredValue>> {
        with_timeout(self.command_timeout, || async {
            let mut conn = self.get_conn().await?;
            let value = match kind {
                ValueKind::Bytes => {
                    let raw: Option<Vec<u8>> = conn.get(key).await?;
                    raw.map(|encoded| self.codec.decode(&encoded))
                        .transpose()?
                        .map(StoredValue::Bytes)
                }
                ValueKind::Text => {
                    let raw: Option<String> = conn.get(key).await?;
                    raw.map(StoredValue::Text)
                }
            };

            match &value {
                Some(_) => debug!("Cache hit for key '{}'", key),
                None => debug!("Cache miss for key '{}'", key),
            }
            Ok(value)
        })
        .await
    }

    async fn add(
        &self,
        key: &str,
        value: StoredValue,
        expires_at: DateTime<Utc>,
        group_key: Option<&str>,
    ) -> OutcacheResult<()> {
        // The base key set is the group sentinel.
        if value.is_sentinel() {
            return Ok(());
        }

        let ttl_ms = (expires_at - Utc::now()).num_milliseconds();
        if ttl_ms <= 0 {
            debug!(key, "Dropping Redis write with non-positive TTL");
            return Ok(());
        }

        let payload = match value {
            StoredValue::Bytes(bytes) => self.codec.encode(&bytes),
            StoredValue::Text(text) => text.into_bytes(),
        };

        with_timeout(self.command_timeout, || async {
            let mut conn = self.get_conn().await?;
            conn.pset_ex::<_, _, ()>(key, payload, ttl_ms.unsigned_abs())
                .await?;

            if let Some(group) = group_key {
                conn.sadd::<_, _, ()>(group, key).await?;
                // Keep the set alive at least as long as its newest member.
                let remaining: i64 = conn.pttl(group).await?;
                if remaining == -1 || (0..ttl_ms).contains(&remaining) {
                    conn.pexpire::<_, ()>(group, ttl_ms).await?;
                }
            }

            debug!(key, group = ?group_key, ttl_ms, "Cached key");
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &str) -> OutcacheResult<()> {
        with_timeout(self.command_timeout, || async {
            let mut conn = self.get_conn().await?;
            let deleted: i64 = conn.del(key).await?;
            debug!("Deleted key '{}': {}", key, deleted > 0);
            Ok(())
        })
        .await
    }

    async fn remove_group(&self, key: &str) -> OutcacheResult<u64> {
        if is_pattern(key) {
            return self.remove_matching(key).await;
        }

        let mut conn = self.round_trip(self.get_conn()).await?;
        let members: Vec<String> = self
            .round_trip(async { Ok(conn.smembers(key).await?) })
            .await?;
        let mut deleted = self.delete_keys(&mut conn, &members).await?;
        let base: u64 = self.round_trip(async { Ok(conn.del(key).await?) }).await?;
        deleted += base;

        debug!(group = key, members = members.len(), deleted, "Deleted Redis group");
        Ok(deleted)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
