//! In-process output store.

use crate::glob::GlobMatcher;
use crate::{OutputStore, StoredValue, ValueKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outcache_core::{is_pattern, OutcacheResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default capacity of a local store.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug)]
struct LocalEntry {
    value: StoredValue,
    expires_at: DateTime<Utc>,
    group: Option<CancellationToken>,
}

impl LocalEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now && !self.group.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

#[derive(Debug, Default)]
struct LocalState {
    entries: HashMap<String, LocalEntry>,
    groups: HashMap<String, CancellationToken>,
}

impl LocalState {
    fn purge_expired(&mut self, now: DateTime<Utc>) -> u64 {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        (before - self.entries.len()) as u64
    }

    /// Evicts the entry closest to expiry.
    fn evict_one(&mut self) -> Option<String> {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.expires_at)
            .map(|(key, _)| key.clone())?;
        self.entries.remove(&victim);
        Some(victim)
    }

    /// Cancels a group and drops every entry linked to it.
    fn cascade(&mut self, base_key: &str) -> u64 {
        let mut removed = 0;
        if let Some(token) = self.groups.remove(base_key) {
            token.cancel();
            let before = self.entries.len();
            self.entries
                .retain(|_, entry| !entry.group.as_ref().is_some_and(CancellationToken::is_cancelled));
            removed += (before - self.entries.len()) as u64;
        }
        if self.entries.remove(base_key).is_some() {
            removed += 1;
        }
        removed
    }
}

/// Output store backed by an in-process map.
///
/// Each group owns a [`CancellationToken`]; members hold a clone of it, so
/// cancelling the token invalidates the whole group at once. The next add to
/// the group starts a fresh token.
#[derive(Debug)]
pub struct LocalOutputStore {
    state: RwLock<LocalState>,
    max_entries: usize,
}

impl Default for LocalOutputStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl LocalOutputStore {
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: RwLock::new(LocalState::default()),
            max_entries: max_entries.max(1),
        }
    }

    /// Number of entries held, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove_matching(&self, pattern: &str) -> OutcacheResult<u64> {
        let glob = GlobMatcher::new(pattern)?;
        let mut state = self.state.write();

        let groups: Vec<String> = state
            .groups
            .keys()
            .filter(|key| glob.is_match(key))
            .cloned()
            .collect();
        let mut removed = 0;
        for group in &groups {
            removed += state.cascade(group);
        }

        let before = state.entries.len();
        state.entries.retain(|key, _| !glob.is_match(key));
        removed += (before - state.entries.len()) as u64;

        debug!(pattern, removed, "Removed local entries matching pattern");
        Ok(removed)
    }
}

#[async_trait]
impl OutputStore for LocalOutputStore {
    async fn contains(&self, key: &str) -> OutcacheResult<bool> {
        let now = Utc::now();
        let state = self.state.read();
        Ok(state.entries.get(key).is_some_and(|entry| entry.is_live(now)))
    }

    async fn get(&self, key: &str, _kind: ValueKind) -> OutcacheResult<Option<StoredValue>> {
        let now = Utc::now();
        let state = self.state.read();
        Ok(state
            .entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn add(
        &self,
        key: &str,
        value: StoredValue,
        expires_at: DateTime<Utc>,
        group_key: Option<&str>,
    ) -> OutcacheResult<()> {
        let now = Utc::now();
        if expires_at <= now {
            debug!(key, "Dropping local entry that is already expired");
            return Ok(());
        }

        let mut state = self.state.write();

        if value.is_sentinel() && group_key.is_none() {
            state
                .groups
                .entry(key.to_string())
                .or_insert_with(CancellationToken::new);
        }

        let group = group_key.map(|group| {
            state
                .groups
                .entry(group.to_string())
                .or_insert_with(CancellationToken::new)
                .clone()
        });

        if !state.entries.contains_key(key) && state.entries.len() >= self.max_entries {
            state.purge_expired(now);
            if state.entries.len() >= self.max_entries {
                if let Some(evicted) = state.evict_one() {
                    debug!(key = %evicted, "Evicted local entry at capacity");
                }
            }
        }

        state.entries.insert(
            key.to_string(),
            LocalEntry {
                value,
                expires_at,
                group,
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> OutcacheResult<()> {
        self.state.write().entries.remove(key);
        Ok(())
    }

    async fn remove_group(&self, key: &str) -> OutcacheResult<u64> {
        if is_pattern(key) {
            return self.remove_matching(key);
        }

        let removed = self.state.write().cascade(key);
        debug!(group = key, removed, "Removed local group");
        Ok(removed)
    }

    async fn purge_expired(&self) -> OutcacheResult<u64> {
        Ok(self.state.write().purge_expired(Utc::now()))
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OutputStoreExt;
    use chrono::Duration;
    use tokio_test::assert_ok;

    fn later() -> DateTime<Utc> {
        Utc::now() + Duration::minutes(5)
    }

    fn bytes(data: &str) -> StoredValue {
        StoredValue::Bytes(data.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_add_then_get() {
        let store = LocalOutputStore::default();
        store.add("k", bytes("payload"), later(), None).await.unwrap();

        assert!(store.contains("k").await.unwrap());
        assert_eq!(store.get_bytes("k").await.unwrap(), Some(b"payload".to_vec()));
        assert_eq!(store.get("missing", ValueKind::Bytes).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let store = LocalOutputStore::default();
        store.add("k", bytes("one"), later(), None).await.unwrap();
        store.add("k", bytes("two"), later(), None).await.unwrap();
        assert_eq!(store.get_bytes("k").await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_entries_are_invisible() {
        let store = LocalOutputStore::default();
        store
            .add("gone", bytes("x"), Utc::now() - Duration::seconds(1), None)
            .await
            .unwrap();
        assert!(!store.contains("gone").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_remove_twice_is_noop() {
        let store = LocalOutputStore::default();
        store.add("k", bytes("x"), later(), None).await.unwrap();
        assert_ok!(store.remove("k").await);
        assert_ok!(store.remove("k").await);
        assert!(!store.contains("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_group_removal_cascades() {
        let store = LocalOutputStore::default();
        let exp = later();
        store.add("base", StoredValue::sentinel(), exp, None).await.unwrap();
        store.add("base-id=1:json", bytes("a"), exp, Some("base")).await.unwrap();
        store.add("base-id=1:json:meta", StoredValue::Text("{}".into()), exp, Some("base")).await.unwrap();
        store.add("other", bytes("b"), exp, None).await.unwrap();

        let removed = store.remove_group("base").await.unwrap();
        assert_eq!(removed, 3);
        assert!(!store.contains("base").await.unwrap());
        assert!(!store.contains("base-id=1:json").await.unwrap());
        assert!(!store.contains("base-id=1:json:meta").await.unwrap());
        assert!(store.contains("other").await.unwrap());
    }

    #[tokio::test]
    async fn test_group_is_usable_after_removal() {
        let store = LocalOutputStore::default();
        let exp = later();
        store.add("base", StoredValue::sentinel(), exp, None).await.unwrap();
        store.add("base-a", bytes("a"), exp, Some("base")).await.unwrap();
        store.remove_group("base").await.unwrap();

        store.add("base", StoredValue::sentinel(), exp, None).await.unwrap();
        store.add("base-a", bytes("fresh"), exp, Some("base")).await.unwrap();
        assert_eq!(store.get_bytes("base-a").await.unwrap(), Some(b"fresh".to_vec()));
    }

    #[tokio::test]
    async fn test_removing_unknown_group_is_noop() {
        let store = LocalOutputStore::default();
        assert_eq!(store.remove_group("nothing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pattern_removal() {
        let store = LocalOutputStore::default();
        let exp = later();
        store.add("w-getwidget", StoredValue::sentinel(), exp, None).await.unwrap();
        store.add("w-getwidget-id=1:json", bytes("1"), exp, Some("w-getwidget")).await.unwrap();
        store.add("w-getwidget-id=2:json", bytes("2"), exp, Some("w-getwidget")).await.unwrap();

        let removed = store.remove_group("w-getwidget-*id=1[&:]*").await.unwrap();
        assert_eq!(removed, 1);
        assert!(!store.contains("w-getwidget-id=1:json").await.unwrap());
        assert!(store.contains("w-getwidget-id=2:json").await.unwrap());
        assert!(store.contains("w-getwidget").await.unwrap());
    }

    #[tokio::test]
    async fn test_star_in_key_is_literal() {
        let store = LocalOutputStore::default();
        let exp = later();
        store.add("w-list-q=abc:json", bytes("abc"), exp, None).await.unwrap();

        assert!(!store.contains("w-list-q=a*:json").await.unwrap());
        store.add("w-list-q=a*:json", bytes("star"), exp, None).await.unwrap();
        assert!(store.contains("w-list-q=a*:json").await.unwrap());
        assert_eq!(
            store.get_bytes("w-list-q=a*:json").await.unwrap(),
            Some(b"star".to_vec())
        );
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_escaped_pattern_removes_only_literal_star_variant() {
        let store = LocalOutputStore::default();
        let exp = later();
        store.add("w-list", StoredValue::sentinel(), exp, None).await.unwrap();
        store.add("w-list-q=a*:json", bytes("star"), exp, Some("w-list")).await.unwrap();
        store.add("w-list-q=abc:json", bytes("abc"), exp, Some("w-list")).await.unwrap();

        let pairs = vec![("q".to_string(), "a*".to_string())];
        let removed = store
            .remove_group(&outcache_core::narrowing_pattern("w-list", &pairs))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(!store.contains("w-list-q=a*:json").await.unwrap());
        assert!(store.contains("w-list-q=abc:json").await.unwrap());
    }

    #[tokio::test]
    async fn test_capacity_evicts_closest_to_expiry() {
        let store = LocalOutputStore::new(2);
        let now = Utc::now();
        store.add("short", bytes("s"), now + Duration::seconds(10), None).await.unwrap();
        store.add("long", bytes("l"), now + Duration::hours(1), None).await.unwrap();
        store.add("new", bytes("n"), now + Duration::minutes(30), None).await.unwrap();

        assert_eq!(store.len(), 2);
        assert!(!store.contains("short").await.unwrap());
        assert!(store.contains("long").await.unwrap());
        assert!(store.contains("new").await.unwrap());
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let store = LocalOutputStore::default();
        store.add_json("meta", &vec![1, 2, 3], later(), None).await.unwrap();
        let value: Option<Vec<u32>> = store.get_json("meta").await.unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = LocalOutputStore::default();
        store
            .add("soon", bytes("x"), Utc::now() + Duration::milliseconds(1), None)
            .await
            .unwrap();
        store.add("later", bytes("y"), later(), None).await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.backend(), "local");
    }
}
