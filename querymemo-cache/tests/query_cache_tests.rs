//! Integration tests for the query cache accessor
//!
//! These tests verify:
//! - Identity rules (trimming, scope isolation, sensitivity)
//! - TTL expiry through the in-memory store
//! - Namespace-local clearing
//! - Failure containment against a broken store

use async_trait::async_trait;
use querymemo_cache::{
    derive_key, CacheError, CacheKey, CacheStore, MemoryStore, QueryCache, QueryCacheConfig,
    QueryCacheEntry,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn memory_cache() -> (MemoryStore, QueryCache) {
    let config = QueryCacheConfig::default();
    let store = MemoryStore::new();
    let ns = store.namespace(config.namespace.clone());
    (store, QueryCache::new(Arc::new(ns), config))
}

/// Store whose every operation fails, counting how often it was called
#[derive(Default)]
struct FailingStore {
    calls: AtomicUsize,
}

#[async_trait]
impl CacheStore for FailingStore {
    async fn get(&self, _key: &CacheKey) -> querymemo_cache::Result<Option<QueryCacheEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Store("connection refused".to_string()))
    }

    async fn set(
        &self,
        _key: &CacheKey,
        _entry: QueryCacheEntry,
        _ttl: Duration,
    ) -> querymemo_cache::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Store("connection refused".to_string()))
    }

    async fn clear(&self) -> querymemo_cache::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Store("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_round_trip_keeps_original_query() {
    let (_, cache) = memory_cache();

    assert!(cache.set("Show balances by branch", json!({"rows": [1, 2, 3]}), "", None).await);

    let entry = cache.get("Show balances by branch", "").await.unwrap();
    assert_eq!(entry.result, json!({"rows": [1, 2, 3]}));
    assert_eq!(entry.query, "Show balances by branch");
    assert_eq!(entry.scope, "");
}

#[tokio::test]
async fn test_trim_equivalence() {
    let (_, cache) = memory_cache();

    assert!(cache.set("q", json!("r"), "", None).await);
    let entry = cache.get("  q  ", "").await.unwrap();
    assert_eq!(entry.result, json!("r"));

    // Written untrimmed, the entry keeps the raw text
    assert!(cache.set("\tp \n", json!("s"), "", None).await);
    let entry = cache.get("p", "").await.unwrap();
    assert_eq!(entry.query, "\tp \n");
}

#[tokio::test]
async fn test_scope_isolation() {
    let (_, cache) = memory_cache();

    assert!(cache.set("q", json!("r1"), "userA", None).await);

    assert!(cache.get("q", "userB").await.is_none());
    assert!(cache.get("q", "").await.is_none());
    let entry = cache.get("q", "userA").await.unwrap();
    assert_eq!(entry.result, json!("r1"));
    assert_eq!(entry.scope, "userA");
}

#[tokio::test]
async fn test_distinct_intents_do_not_collide() {
    let (_, cache) = memory_cache();

    cache.set("balances by branch", json!("all years"), "", None).await;
    cache
        .set("balances by branch and fiscal year 2015", json!("fy2015"), "", None)
        .await;

    assert_eq!(cache.get("balances by branch", "").await.unwrap().result, json!("all years"));
    assert_eq!(
        cache
            .get("balances by branch and fiscal year 2015", "")
            .await
            .unwrap()
            .result,
        json!("fy2015")
    );
}

#[tokio::test]
async fn test_ttl_expiry() {
    let (_, cache) = memory_cache();
    let text = "revenue by region last quarter";

    assert!(cache.set(text, json!([1]), "", Some(Duration::from_millis(50))).await);
    assert!(cache.get(text, "").await.is_some());

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(cache.get(text, "").await.is_none());
}

#[tokio::test]
async fn test_default_ttl_from_config() {
    let config = QueryCacheConfig::builder()
        .default_ttl(Duration::from_millis(50))
        .build();
    let store = MemoryStore::new().namespace(config.namespace.clone());
    let cache = QueryCache::new(Arc::new(store), config);

    assert!(cache.set("q", json!(1), "", None).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(cache.get("q", "").await.is_none());
}

#[tokio::test]
async fn test_out_of_range_ttl_degrades_to_failed_write() {
    let (_, cache) = memory_cache();

    assert!(!cache.set("q", json!(1), "", Some(Duration::MAX)).await);
    assert!(cache.get("q", "").await.is_none());
    assert_eq!(cache.stats().write_failures, 1);

    // Still usable afterwards
    assert!(cache.set("q", json!(1), "", None).await);
    assert!(cache.get("q", "").await.is_some());
}

#[tokio::test]
async fn test_null_result_is_cacheable() {
    let (_, cache) = memory_cache();

    assert!(cache.set("q", json!(null), "", None).await);
    assert_eq!(cache.get("q", "").await.unwrap().result, json!(null));
}

#[tokio::test]
async fn test_clear_all_leaves_other_namespaces() {
    let config = QueryCacheConfig::default();
    let store = MemoryStore::new();
    let cache = QueryCache::new(Arc::new(store.namespace(config.namespace.clone())), config);
    let other = store.namespace("sessions");
    let key = derive_key("q", "");

    other
        .set(&key, QueryCacheEntry::new("q", json!("session"), ""), Duration::from_secs(60))
        .await
        .unwrap();
    cache.set("q", json!("result"), "", None).await;

    assert!(cache.clear_all().await);

    assert!(cache.get("q", "").await.is_none());
    assert!(other.get(&key).await.unwrap().is_some());
    assert_eq!(cache.stats().clears, 1);
}

#[tokio::test]
async fn test_store_failures_are_contained() {
    let store = Arc::new(FailingStore::default());
    let cache = QueryCache::new(store.clone(), QueryCacheConfig::default());

    assert!(cache.get("q", "").await.is_none());
    assert!(!cache.set("q", json!(1), "", None).await);
    assert!(!cache.clear_all().await);
    assert_eq!(store.calls.load(Ordering::SeqCst), 3);

    let stats = cache.stats();
    assert_eq!(stats.read_errors, 1);
    assert_eq!(stats.write_failures, 1);
    assert_eq!(stats.clear_failures, 1);
    assert_eq!(stats.hits + stats.misses, 0);
}

#[tokio::test]
async fn test_invalid_input_never_reaches_store() {
    let store = Arc::new(FailingStore::default());
    let cache = QueryCache::new(store.clone(), QueryCacheConfig::default());

    assert!(cache.get("", "userA").await.is_none());
    assert!(cache.get("   ", "").await.is_none());
    assert!(!cache.set("", json!(1), "", None).await);

    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_concurrent_identical_writes_last_writer_wins() {
    let (store, cache) = memory_cache();
    let cache = Arc::new(cache);

    let writes = (0..8).map(|i| {
        let cache = cache.clone();
        async move { cache.set("same query", json!(i), "", None).await }
    });
    let results = futures::future::join_all(writes).await;
    assert!(results.into_iter().all(|ok| ok));

    let entry = cache.get("same query", "").await.unwrap();
    assert!(entry.result.as_i64().is_some_and(|i| (0..8).contains(&i)));
    assert_eq!(store.len().await, 1);
}
