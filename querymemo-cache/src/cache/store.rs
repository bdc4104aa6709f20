//! TTL store collaborator and the in-memory backend
//!
//! The accessor only talks to [`CacheStore`]. [`MemoryStore`] is one physical
//! store shared by several logical namespaces; each [`MemoryNamespace`] handle
//! sees and clears only its own entries.

use crate::cache::{entry::QueryCacheEntry, key::CacheKey};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// TTL-aware key-value store for query cache entries
///
/// Implementations must be safe for concurrent use; the accessor adds no
/// locking of its own. Expired entries must read as absent.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a live entry
    async fn get(&self, key: &CacheKey) -> Result<Option<QueryCacheEntry>>;

    /// Store an entry, replacing any previous one under the same key
    async fn set(&self, key: &CacheKey, entry: QueryCacheEntry, ttl: Duration) -> Result<()>;

    /// Remove every entry in this store's namespace
    async fn clear(&self) -> Result<()>;
}

struct StoredEntry {
    entry: QueryCacheEntry,
    expires_at: Instant,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

type Namespaces = HashMap<String, HashMap<CacheKey, StoredEntry>>;

/// In-memory physical store with per-entry expiry
#[derive(Clone, Default)]
pub struct MemoryStore {
    namespaces: Arc<RwLock<Namespaces>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a handle scoped to one logical namespace
    pub fn namespace(&self, name: impl Into<String>) -> MemoryNamespace {
        MemoryNamespace {
            name: name.into(),
            namespaces: self.namespaces.clone(),
        }
    }

    /// Remove expired entries from every namespace, returning how many were dropped
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut namespaces = self.namespaces.write().await;
        let mut removed = 0;

        for entries in namespaces.values_mut() {
            let before = entries.len();
            entries.retain(|_, stored| !stored.is_expired(now));
            removed += before - entries.len();
        }
        namespaces.retain(|_, entries| !entries.is_empty());

        if removed > 0 {
            debug!("Cleaned up {} expired entries", removed);
        }
        removed
    }

    /// Total number of stored entries across namespaces, expired ones included
    pub async fn len(&self) -> usize {
        let namespaces = self.namespaces.read().await;
        namespaces.values().map(HashMap::len).sum()
    }

    /// Check if the store holds no entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Handle onto one namespace of a [`MemoryStore`]
#[derive(Clone)]
pub struct MemoryNamespace {
    name: String,
    namespaces: Arc<RwLock<Namespaces>>,
}

impl MemoryNamespace {
    /// Namespace name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of entries in this namespace, expired ones included
    pub async fn len(&self) -> usize {
        let namespaces = self.namespaces.read().await;
        namespaces.get(&self.name).map_or(0, HashMap::len)
    }

    /// Check if this namespace holds no entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryNamespace {
    async fn get(&self, key: &CacheKey) -> Result<Option<QueryCacheEntry>> {
        let now = Instant::now();
        {
            let namespaces = self.namespaces.read().await;
            match namespaces.get(&self.name).and_then(|entries| entries.get(key)) {
                Some(stored) if !stored.is_expired(now) => return Ok(Some(stored.entry.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it unless a writer replaced it in the meantime
        let mut namespaces = self.namespaces.write().await;
        if let Some(entries) = namespaces.get_mut(&self.name) {
            if entries.get(key).is_some_and(|stored| stored.is_expired(now)) {
                entries.remove(key);
                debug!(namespace = %self.name, key = %key, "Dropped expired entry");
            }
        }
        Ok(None)
    }

    async fn set(&self, key: &CacheKey, entry: QueryCacheEntry, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::Store(format!("ttl {:?} is out of range", ttl)))?;
        let mut namespaces = self.namespaces.write().await;
        namespaces
            .entry(self.name.clone())
            .or_default()
            .insert(key.clone(), StoredEntry { entry, expires_at });
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut namespaces = self.namespaces.write().await;
        let count = namespaces.remove(&self.name).map_or(0, |entries| entries.len());
        info!(namespace = %self.name, "Cleared {} entries", count);
        Ok(())
    }
}

/// Background task sweeping expired entries on a fixed interval
pub async fn start_auto_cleanup(store: MemoryStore, interval: Duration) {
    info!("Starting automatic cache cleanup task (interval: {:?})", interval);

    let mut ticker = tokio::time::interval(interval);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let removed = store.cleanup_expired().await;
        if removed > 0 {
            debug!("Auto cleanup removed {} entries", removed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::derive_key;
    use serde_json::json;

    fn entry(query: &str) -> QueryCacheEntry {
        QueryCacheEntry::new(query, json!({"q": query}), "")
    }

    #[tokio::test]
    async fn test_basic_set_and_get() {
        let store = MemoryStore::new();
        let ns = store.namespace("query-results");
        let key = derive_key("q1", "");

        ns.set(&key, entry("q1"), Duration::from_secs(60)).await.unwrap();

        let found = ns.get(&key).await.unwrap().unwrap();
        assert_eq!(found.query, "q1");
        assert_eq!(ns.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let ns = MemoryStore::new().namespace("query-results");
        assert!(ns.get(&derive_key("nope", "")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let ns = MemoryStore::new().namespace("query-results");
        let key = derive_key("q", "");

        ns.set(&key, QueryCacheEntry::new("q", json!(1), ""), Duration::from_secs(60))
            .await
            .unwrap();
        ns.set(&key, QueryCacheEntry::new("q", json!(2), ""), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(ns.get(&key).await.unwrap().unwrap().result, json!(2));
        assert_eq!(ns.len().await, 1);
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let ns = MemoryStore::new().namespace("query-results");
        let key = derive_key("q", "");

        ns.set(&key, entry("q"), Duration::from_millis(50)).await.unwrap();
        assert!(ns.get(&key).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(ns.get(&key).await.unwrap().is_none());
        // Lazily removed on read
        assert_eq!(ns.len().await, 0);
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_is_an_error() {
        let ns = MemoryStore::new().namespace("query-results");
        let key = derive_key("q", "");

        let result = ns.set(&key, entry("q"), Duration::MAX).await;
        assert!(matches!(result, Err(CacheError::Store(_))));
        assert!(ns.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear_is_namespace_local() {
        let store = MemoryStore::new();
        let results = store.namespace("query-results");
        let sessions = store.namespace("sessions");
        let key = derive_key("q", "");

        results.set(&key, entry("q"), Duration::from_secs(60)).await.unwrap();
        sessions.set(&key, entry("q"), Duration::from_secs(60)).await.unwrap();

        results.clear().await.unwrap();

        assert!(results.get(&key).await.unwrap().is_none());
        assert!(sessions.get(&key).await.unwrap().is_some());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let store = MemoryStore::new();
        let ns = store.namespace("query-results");

        ns.set(&derive_key("a", ""), entry("a"), Duration::from_millis(20)).await.unwrap();
        ns.set(&derive_key("b", ""), entry("b"), Duration::from_millis(20)).await.unwrap();
        ns.set(&derive_key("c", ""), entry("c"), Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(store.cleanup_expired().await, 2);
        assert_eq!(ns.len().await, 1);
    }
}
