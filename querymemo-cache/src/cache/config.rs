//! Configuration for the query cache

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Default time-to-live for cached query results (10 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Default logical namespace for query results in a shared store
pub const DEFAULT_NAMESPACE: &str = "query-results";

/// Environment variable overriding the default TTL, in seconds
pub const TTL_ENV: &str = "QUERY_CACHE_TTL_SECS";

/// Environment variable overriding the store namespace
pub const NAMESPACE_ENV: &str = "QUERY_CACHE_NAMESPACE";

/// Configuration for the query cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryCacheConfig {
    /// TTL applied when a write does not name one
    pub default_ttl: Duration,

    /// Logical namespace for query results in the physical store
    pub namespace: String,

    /// Number of query characters included in diagnostic events
    pub preview_chars: usize,

    /// Interval for sweeping expired entries out of the in-memory store
    pub cleanup_interval: Duration,
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            namespace: DEFAULT_NAMESPACE.to_string(),
            preview_chars: 50,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl QueryCacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> QueryCacheConfigBuilder {
        QueryCacheConfigBuilder::default()
    }

    /// Defaults, overridden by `QUERY_CACHE_TTL_SECS` and `QUERY_CACHE_NAMESPACE`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(TTL_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                CacheError::Config(format!("{} must be an integer, got {:?}", TTL_ENV, raw))
            })?;
            config.default_ttl = Duration::from_secs(secs);
        }

        if let Ok(namespace) = std::env::var(NAMESPACE_ENV) {
            config.namespace = namespace;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.default_ttl.is_zero() {
            return Err(CacheError::Config("default_ttl must be greater than 0".to_string()));
        }

        if !representable(self.default_ttl) {
            return Err(CacheError::Config(format!(
                "default_ttl {:?} is out of range",
                self.default_ttl
            )));
        }

        if self.namespace.trim().is_empty() {
            return Err(CacheError::Config("namespace must not be empty".to_string()));
        }

        if self.cleanup_interval.is_zero() {
            return Err(CacheError::Config(
                "cleanup_interval must be greater than 0".to_string(),
            ));
        }

        if !representable(self.cleanup_interval) {
            return Err(CacheError::Config(format!(
                "cleanup_interval {:?} is out of range",
                self.cleanup_interval
            )));
        }

        Ok(())
    }
}

/// Whether a deadline `duration` from now fits in an `Instant`
fn representable(duration: Duration) -> bool {
    Instant::now().checked_add(duration).is_some()
}

/// Builder for query cache configuration
#[derive(Debug, Default)]
pub struct QueryCacheConfigBuilder {
    default_ttl: Option<Duration>,
    namespace: Option<String>,
    preview_chars: Option<usize>,
    cleanup_interval: Option<Duration>,
}

impl QueryCacheConfigBuilder {
    /// Set default TTL for cache entries
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Set the store namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set how many query characters diagnostics may include
    pub fn preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = Some(chars);
        self
    }

    /// Set cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> QueryCacheConfig {
        let defaults = QueryCacheConfig::default();

        QueryCacheConfig {
            default_ttl: self.default_ttl.unwrap_or(defaults.default_ttl),
            namespace: self.namespace.unwrap_or(defaults.namespace),
            preview_chars: self.preview_chars.unwrap_or(defaults.preview_chars),
            cleanup_interval: self.cleanup_interval.unwrap_or(defaults.cleanup_interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QueryCacheConfig::default();
        assert_eq!(config.default_ttl, Duration::from_secs(600));
        assert_eq!(config.namespace, "query-results");
        assert_eq!(config.preview_chars, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut invalid = QueryCacheConfig::default();
        invalid.default_ttl = Duration::ZERO;
        assert!(invalid.validate().is_err());

        let mut invalid = QueryCacheConfig::default();
        invalid.namespace = "  ".to_string();
        assert!(invalid.validate().is_err());

        let mut invalid = QueryCacheConfig::default();
        invalid.cleanup_interval = Duration::ZERO;
        assert!(invalid.validate().is_err());

        let mut invalid = QueryCacheConfig::default();
        invalid.default_ttl = Duration::MAX;
        assert!(invalid.validate().is_err());

        let mut invalid = QueryCacheConfig::default();
        invalid.cleanup_interval = Duration::from_secs(u64::MAX);
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_from_env() {
        std::env::set_var(TTL_ENV, "30");
        std::env::set_var(NAMESPACE_ENV, "nlq-results");
        let config = QueryCacheConfig::from_env().unwrap();
        assert_eq!(config.default_ttl, Duration::from_secs(30));
        assert_eq!(config.namespace, "nlq-results");

        std::env::set_var(TTL_ENV, "ten minutes");
        assert!(matches!(QueryCacheConfig::from_env(), Err(CacheError::Config(_))));

        std::env::set_var(TTL_ENV, u64::MAX.to_string());
        assert!(matches!(QueryCacheConfig::from_env(), Err(CacheError::Config(_))));

        std::env::remove_var(TTL_ENV);
        std::env::remove_var(NAMESPACE_ENV);
    }

    #[test]
    fn test_config_builder() {
        let config = QueryCacheConfig::builder()
            .default_ttl(Duration::from_millis(50))
            .namespace("nlq")
            .preview_chars(10)
            .build();

        assert_eq!(config.default_ttl, Duration::from_millis(50));
        assert_eq!(config.namespace, "nlq");
        assert_eq!(config.preview_chars, 10);
        assert_eq!(config.cleanup_interval, Duration::from_secs(60));
    }
}
