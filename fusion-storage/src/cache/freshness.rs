//! Freshness policy and cache read results.
//!
//! A cache record is fresh for `ttl` after its last successful fetch. Every
//! read through the cache comes back wrapped in a [`CacheRead<T>`] so callers
//! can tell a hit from a network fetch.

use chrono::Utc;
use fusion_core::Timestamp;
use std::time::Duration;

/// Configuration for the cached fetch decorator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a successful fetch stays valid.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry TTL. A zero TTL disables cache hits entirely.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Whether a record fetched at `fetched_at` is still valid at `now`.
    pub fn is_fresh(&self, fetched_at: Timestamp, now: Timestamp) -> bool {
        let age = now
            .signed_duration_since(fetched_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        age < self.ttl
    }
}

/// Result of a cached read, carrying where the value came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRead<T> {
    value: T,
    /// When the underlying data was last fetched from the backend.
    fetched_at: Timestamp,
    was_cache_hit: bool,
}

impl<T> CacheRead<T> {
    /// Create a new cache read from a cache hit.
    pub fn from_cache(value: T, fetched_at: Timestamp) -> Self {
        Self {
            value,
            fetched_at,
            was_cache_hit: true,
        }
    }

    /// Create a new cache read from a completed fetch.
    pub fn from_fetch(value: T, fetched_at: Timestamp) -> Self {
        Self {
            value,
            fetched_at,
            was_cache_hit: false,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn fetched_at(&self) -> Timestamp {
        self.fetched_at
    }

    /// Time since the data was fetched.
    pub fn age(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.fetched_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            fetched_at: self.fetched_at,
            was_cache_hit: self.was_cache_hit,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_builder() {
        let config = CacheConfig::new().with_ttl(Duration::from_secs(30));
        assert_eq!(config.ttl, Duration::from_secs(30));
        assert_eq!(CacheConfig::default().ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_is_fresh_within_ttl() {
        let config = CacheConfig::new().with_ttl(Duration::from_secs(60));
        let now = Utc::now();
        assert!(config.is_fresh(now - chrono::Duration::seconds(59), now));
        assert!(!config.is_fresh(now - chrono::Duration::seconds(60), now));
        assert!(!config.is_fresh(now - chrono::Duration::seconds(3600), now));
    }

    #[test]
    fn test_zero_ttl_is_never_fresh() {
        let config = CacheConfig::new().with_ttl(Duration::ZERO);
        let now = Utc::now();
        assert!(!config.is_fresh(now, now));
    }

    #[test]
    fn test_future_fetch_time_counts_as_fresh() {
        let config = CacheConfig::new().with_ttl(Duration::from_secs(1));
        let now = Utc::now();
        assert!(config.is_fresh(now + chrono::Duration::seconds(5), now));
    }

    #[test]
    fn test_cache_read_from_cache() {
        let fetched_at = Utc::now();
        let read = CacheRead::from_cache("value".to_string(), fetched_at);
        assert!(read.was_cache_hit());
        assert!(!read.was_cache_miss());
        assert_eq!(read.value(), "value");
        assert_eq!(read.fetched_at(), fetched_at);
    }

    #[test]
    fn test_cache_read_age() {
        let past = Utc::now() - chrono::Duration::seconds(5);
        let read = CacheRead::from_fetch(1, past);
        let age = read.age();
        assert!(age >= Duration::from_secs(4));
        assert!(age <= Duration::from_secs(10));
    }

    #[test]
    fn test_cache_read_map() {
        let read = CacheRead::from_fetch(42i32, Utc::now());
        let mapped = read.map(|v| v.to_string());
        assert!(mapped.was_cache_miss());
        assert_eq!(mapped.into_value(), "42");
    }
}
