//! Query cache accessor
//!
//! Maps a logical (scope, query text) identity onto a store key and contains
//! every store failure: reads degrade to a miss, writes and clears degrade to
//! `false`. Nothing here returns an error to the caller.

use crate::cache::{
    config::QueryCacheConfig,
    entry::QueryCacheEntry,
    key::{derive_key, CacheKey},
    store::CacheStore,
    types::{CacheStats, StatsRecorder},
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Query result cache over an injected [`CacheStore`]
pub struct QueryCache {
    store: Arc<dyn CacheStore>,
    config: QueryCacheConfig,
    stats: StatsRecorder,
}

impl QueryCache {
    /// Create a cache over a store handle for the query-results namespace
    pub fn new(store: Arc<dyn CacheStore>, config: QueryCacheConfig) -> Self {
        Self {
            store,
            config,
            stats: StatsRecorder::default(),
        }
    }

    /// Key a query would be stored under, or `None` for empty query text
    pub fn key_for(&self, query: &str, scope: &str) -> Option<CacheKey> {
        normalize(query).map(|trimmed| derive_key(trimmed, scope))
    }

    /// Look up a cached result
    pub async fn get(&self, query: &str, scope: &str) -> Option<QueryCacheEntry> {
        let Some(key) = self.key_for(query, scope) else {
            self.stats.rejected();
            return None;
        };
        let preview = self.preview(query);

        match self.store.get(&key).await {
            Ok(Some(entry)) => {
                self.stats.hit();
                info!(key = %key, query = %preview, scope, "query cache hit");
                Some(entry)
            }
            Ok(None) => {
                self.stats.miss();
                debug!(key = %key, query = %preview, scope, "query cache miss");
                None
            }
            Err(e) => {
                self.stats.read_error();
                warn!(key = %key, query = %preview, scope, error = %e, "query cache read failed");
                None
            }
        }
    }

    /// Store a result; `ttl` defaults to the configured TTL
    ///
    /// Returns whether the store accepted the write.
    pub async fn set(
        &self,
        query: &str,
        result: Value,
        scope: &str,
        ttl: Option<Duration>,
    ) -> bool {
        let Some(key) = self.key_for(query, scope) else {
            self.stats.rejected();
            return false;
        };
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let entry = QueryCacheEntry::new(query, result, scope);
        let preview = self.preview(query);

        match self.store.set(&key, entry, ttl).await {
            Ok(()) => {
                self.stats.write();
                debug!(
                    key = %key,
                    query = %preview,
                    scope,
                    ttl_ms = ttl.as_millis() as u64,
                    "query cache write"
                );
                true
            }
            Err(e) => {
                self.stats.write_failure();
                warn!(key = %key, query = %preview, scope, error = %e, "query cache write failed");
                false
            }
        }
    }

    /// Drop every entry in the query-results namespace
    pub async fn clear_all(&self) -> bool {
        match self.store.clear().await {
            Ok(()) => {
                self.stats.clear();
                info!(namespace = %self.config.namespace, "query cache cleared");
                true
            }
            Err(e) => {
                self.stats.clear_failure();
                warn!(namespace = %self.config.namespace, error = %e, "query cache clear failed");
                false
            }
        }
    }

    /// Snapshot of hit/miss/error counters
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    fn preview(&self, query: &str) -> String {
        preview(query, self.config.preview_chars)
    }
}

/// Trimmed query text, or `None` when nothing is left to identify
fn normalize(query: &str) -> Option<&str> {
    let trimmed = query.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// First `max_chars` characters of the trimmed query, for diagnostics
pub fn preview(query: &str, max_chars: usize) -> String {
    let trimmed = query.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
