//! Redis store tests against a live server.
//!
//! Run with `OUTCACHE_TEST_REDIS_URL=redis://localhost:6379 cargo test -- --ignored`.

use chrono::{Duration, Utc};
use outcache_config::RedisConfig;
use outcache_store::pool::{create_pool, ping};
use outcache_store::{OutputStore, OutputStoreExt, RedisOutputStore, StoredValue, ValueKind};
use std::sync::Arc;

fn redis_url() -> String {
    std::env::var("OUTCACHE_TEST_REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

async fn store() -> RedisOutputStore {
    let config = RedisConfig {
        url: redis_url(),
        compression_min_size: 0,
        ..RedisConfig::default()
    };
    let pool = create_pool(&config).unwrap();
    ping(&pool, &config).await.unwrap();
    RedisOutputStore::from_config(Arc::new(pool), &config)
}

fn unique(prefix: &str) -> String {
    format!("outcache-test-{}-{}", prefix, Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

#[tokio::test]
#[ignore = "requires a Redis server"]
async fn test_add_then_get_round_trips_payload() {
    let store = store().await;
    let key = unique("payload");
    let payload = br#"{"widgets":[1,2,3]}"#.repeat(50);

    store
        .add(&key, StoredValue::Bytes(payload.clone()), Utc::now() + Duration::minutes(1), None)
        .await
        .unwrap();

    assert!(store.contains(&key).await.unwrap());
    assert_eq!(store.get_bytes(&key).await.unwrap(), Some(payload));
    store.remove(&key).await.unwrap();
    store.remove(&key).await.unwrap();
    assert!(!store.contains(&key).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a Redis server"]
async fn test_text_values_and_empty_payloads() {
    let store = store().await;
    let key = unique("text");
    let exp = Utc::now() + Duration::minutes(1);

    store.add(&key, StoredValue::Text("{\"a\":1}".into()), exp, None).await.unwrap();
    assert_eq!(
        store.get(&key, ValueKind::Text).await.unwrap(),
        Some(StoredValue::Text("{\"a\":1}".into()))
    );

    let empty = unique("empty");
    store.add(&empty, StoredValue::Bytes(Vec::new()), exp, None).await.unwrap();
    assert_eq!(store.get_bytes(&empty).await.unwrap(), Some(Vec::new()));

    store.remove(&key).await.unwrap();
    store.remove(&empty).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a Redis server"]
async fn test_group_removal_deletes_members_and_base() {
    let store = store().await;
    let base = unique("group");
    let exp = Utc::now() + Duration::minutes(1);
    let first = format!("{}-id=1:application/json", base);
    let second = format!("{}-id=2:application/json", base);

    store.add(&base, StoredValue::sentinel(), exp, None).await.unwrap();
    store.add(&first, StoredValue::Bytes(b"1".to_vec()), exp, Some(&base)).await.unwrap();
    store.add(&second, StoredValue::Bytes(b"2".to_vec()), exp, Some(&base)).await.unwrap();
    assert!(store.contains(&base).await.unwrap());

    let removed = store.remove_group(&base).await.unwrap();
    assert_eq!(removed, 3);
    assert!(!store.contains(&base).await.unwrap());
    assert!(!store.contains(&first).await.unwrap());
    assert!(!store.contains(&second).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a Redis server"]
async fn test_pattern_removal_uses_scan() {
    let store = store().await;
    let base = unique("pattern");
    let exp = Utc::now() + Duration::minutes(1);
    let first = format!("{}-id=1:application/json", base);
    let second = format!("{}-id=2:application/json", base);

    store.add(&first, StoredValue::Bytes(b"1".to_vec()), exp, Some(&base)).await.unwrap();
    store.add(&second, StoredValue::Bytes(b"2".to_vec()), exp, Some(&base)).await.unwrap();

    let pattern = format!("{}-*id=1[&:]*", base);
    assert!(!store.contains(&pattern).await.unwrap());
    assert_eq!(store.remove_group(&pattern).await.unwrap(), 1);
    assert!(!store.contains(&first).await.unwrap());
    assert!(store.contains(&second).await.unwrap());

    store.remove_group(&base).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a Redis server"]
async fn test_star_in_key_is_literal() {
    let store = store().await;
    let base = unique("star");
    let exp = Utc::now() + Duration::minutes(1);
    let plain = format!("{}-q=abc:application/json", base);
    let starred = format!("{}-q=a*:application/json", base);

    store.add(&plain, StoredValue::Bytes(b"abc".to_vec()), exp, Some(&base)).await.unwrap();
    assert!(!store.contains(&starred).await.unwrap());

    store.add(&starred, StoredValue::Bytes(b"star".to_vec()), exp, Some(&base)).await.unwrap();
    assert_eq!(store.get_bytes(&starred).await.unwrap(), Some(b"star".to_vec()));

    let pairs = vec![("q".to_string(), "a*".to_string())];
    let pattern = outcache_core::narrowing_pattern(&base, &pairs);
    assert_eq!(store.remove_group(&pattern).await.unwrap(), 1);
    assert!(store.contains(&plain).await.unwrap());

    store.remove_group(&base).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a Redis server"]
async fn test_pattern_removal_spans_many_scan_pages() {
    let store = store().await;
    let base = unique("pages");
    let exp = Utc::now() + Duration::minutes(1);

    for id in 0..1200 {
        let key = format!("{}-id={}:application/json", base, id);
        store.add(&key, StoredValue::Bytes(b"x".to_vec()), exp, None).await.unwrap();
    }

    let removed = store.remove_group(&format!("{}-*", base)).await.unwrap();
    assert_eq!(removed, 1200);
}
