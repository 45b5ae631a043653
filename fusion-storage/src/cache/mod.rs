//! Cached fetch layer with explicit freshness.
//!
//! [`CachedFetch`] sits between a service and its remote source. A read is
//! answered from the [`EntityStore`](crate::EntityStore) while the key's last
//! successful fetch is younger than [`CacheConfig::ttl`]; otherwise the
//! supplied producer runs, and concurrent readers of the same key share that
//! one request.
//!
//! # Example
//!
//! ```ignore
//! let sites = cache
//!     .cached_by_parent_id(company_cache_key(4), move || async move {
//!         transport.get_json(&path).await
//!     })
//!     .await?;
//!
//! if sites.was_cache_hit() {
//!     tracing::debug!(age = ?sites.age(), "served from store");
//! }
//! ```

pub mod cached_fetch;
pub mod freshness;
pub mod key;

pub use cached_fetch::{CacheStats, CachedFetch};
pub use freshness::{CacheConfig, CacheRead};
pub use key::CacheKey;
