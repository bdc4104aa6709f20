//! Cached query result entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// A cached handler result together with the identity it was written under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryCacheEntry {
    /// The cached payload, opaque to the cache
    pub result: Value,

    /// Original query text as received, before trimming
    pub query: String,

    /// When the entry was written
    pub timestamp: DateTime<Utc>,

    /// Requester scope used at write time (empty when unscoped)
    pub scope: String,
}

impl QueryCacheEntry {
    /// Create a new entry stamped with the current time
    pub fn new(query: impl Into<String>, result: Value, scope: impl Into<String>) -> Self {
        Self {
            result,
            query: query.into(),
            timestamp: Utc::now(),
            scope: scope.into(),
        }
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        (Utc::now() - self.timestamp)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }
}
