//! # Query-Identity Cache
//!
//! Memoizes results of free-form textual queries. The cache key is derived
//! from the full identity of a request (requester scope plus trimmed query
//! text), so two queries that hit the same endpoint with different intent
//! never share a slot.
//!
//! ## Components
//!
//! - [`derive_key`]: SHA-256 based, fixed-length key derivation
//! - [`QueryCache`]: get/set/clear over an injected store, with all store
//!   failures contained
//! - [`CacheStore`]: the TTL store collaborator; [`MemoryStore`] is the
//!   in-memory backend with per-namespace isolation
//!
//! ## Example
//!
//! ```rust
//! use querymemo_cache::cache::{MemoryStore, QueryCache, QueryCacheConfig};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let config = QueryCacheConfig::default();
//! let store = MemoryStore::new().namespace(config.namespace.clone());
//! let cache = QueryCache::new(Arc::new(store), config);
//!
//! cache.set("Show balances by branch", json!({"rows": [1, 2, 3]}), "", None).await;
//!
//! if let Some(entry) = cache.get("  Show balances by branch ", "").await {
//!     println!("Cache hit: {}", entry.result);
//! }
//! # }
//! ```

pub mod accessor;
pub mod config;
pub mod entry;
pub mod key;
pub mod store;
pub mod types;

pub use accessor::QueryCache;
pub use config::{QueryCacheConfig, QueryCacheConfigBuilder, DEFAULT_TTL};
pub use entry::QueryCacheEntry;
pub use key::{derive_key, CacheKey, KEY_LEN};
pub use store::{start_auto_cleanup, CacheStore, MemoryNamespace, MemoryStore};
pub use types::CacheStats;
