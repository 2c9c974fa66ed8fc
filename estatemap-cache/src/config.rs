//! Cache configuration.

use estatemap_core::ConfigError;
use std::time::Duration;

/// Default time-to-live of a cache entry (2 hours).
pub const DEFAULT_TTL: Duration = Duration::from_secs(7200);
/// Default number of datasets kept at once.
pub const DEFAULT_CAPACITY: usize = 5;
/// Default upper bound on a single source fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration for the refresh cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Entries older than this are refreshed on the next read.
    pub ttl: Duration,
    /// Maximum number of datasets held; the oldest entry is evicted beyond it.
    pub capacity: usize,
    /// A fetch running longer than this fails with `SourceUnavailable`.
    pub fetch_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            capacity: DEFAULT_CAPACITY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Reject settings the cache cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl.is_zero() {
            return Err(ConfigError::invalid("cache.ttl", "0s", "must be positive"));
        }
        if self.capacity == 0 {
            return Err(ConfigError::invalid("cache.capacity", "0", "must be at least 1"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::invalid(
                "cache.fetch_timeout",
                "0s",
                "must be positive",
            ));
        }
        Ok(())
    }
}
