//! Identity types for Fusion entities

use chrono::{DateTime, Utc};

/// Entity identifier as issued by the backend (a `Long` primary key).
pub type EntityId = i64;

/// Optimistic-concurrency token carried by versioned records.
pub type Version = i64;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Duration in milliseconds for TTL and interval values.
pub type DurationMs = u64;

/// Build the collection cache key used for "all X of company Y" queries.
///
/// Several services share one store per entity type, so the key carries the
/// owner kind as a prefix: `company-42`.
pub fn company_cache_key(company_id: EntityId) -> String {
    format!("company-{}", company_id)
}
