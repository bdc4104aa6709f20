//! # querymemo-cache
//!
//! Query-identity cache for expensive natural-language lookups.
//!
//! Re-issuing an identical query (same requester scope, same text after
//! trimming surrounding whitespace) returns the previously computed result
//! until the store's TTL expires. Store outages only cost performance: every
//! failure degrades to a cache miss or a skipped write.
//!
//! ```no_run
//! use querymemo_cache::{MemoryStore, QueryCache, QueryCacheConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), querymemo_cache::CacheError> {
//!     let config = QueryCacheConfig::from_env()?;
//!     let store = MemoryStore::new();
//!     let cache = QueryCache::new(Arc::new(store.namespace(config.namespace.clone())), config);
//!
//!     match cache.get("balances by branch and fiscal year 2015", "user-42").await {
//!         Some(entry) => println!("cached at {}: {}", entry.timestamp, entry.result),
//!         None => println!("miss"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;

// Re-export main types for convenience
pub use cache::{
    derive_key, start_auto_cleanup, CacheKey, CacheStats, CacheStore, MemoryNamespace,
    MemoryStore, QueryCache, QueryCacheConfig, QueryCacheConfigBuilder, QueryCacheEntry,
    DEFAULT_TTL, KEY_LEN,
};
pub use error::{CacheError, Result};
