//! Cache statistics

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of query cache counters
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found a live entry
    pub hits: u64,

    /// Lookups that found nothing
    pub misses: u64,

    /// Successful writes
    pub writes: u64,

    /// Writes the store refused or failed
    pub write_failures: u64,

    /// Lookups degraded to a miss because the store failed
    pub read_errors: u64,

    /// Calls rejected before reaching the store (empty query text)
    pub rejected: u64,

    /// Successful clear-all operations
    pub clears: u64,

    /// Failed clear-all operations
    pub clear_failures: u64,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage of store lookups
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.read_errors;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Total store failures of any kind
    pub fn total_errors(&self) -> u64 {
        self.read_errors + self.write_failures + self.clear_failures
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, writes: {}, errors: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.writes,
            self.total_errors()
        )
    }
}

/// Lock-free counters behind [`CacheStats`]
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    write_failures: AtomicU64,
    read_errors: AtomicU64,
    rejected: AtomicU64,
    clears: AtomicU64,
    clear_failures: AtomicU64,
}

impl StatsRecorder {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn clear(&self) {
        self.clears.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn clear_failure(&self) {
        self.clear_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
            clear_failures: self.clear_failures.load(Ordering::Relaxed),
        }
    }
}
