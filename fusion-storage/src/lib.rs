//! Fusion Storage - Entity Stores, Queries and Cached Fetch
//!
//! One [`EntityStore`] per entity type holds records keyed by id plus an
//! optional active selection. [`EntityQuery`] exposes read-only projections
//! that re-emit on every mutation, and [`CachedFetch`] decorates remote
//! fetches with freshness tracking and in-flight de-duplication.

pub mod cache;
mod entity;
mod query;
mod store;

pub use cache::{CacheConfig, CacheKey, CacheRead, CacheStats, CachedFetch};
pub use entity::Entity;
pub use query::{EntityQuery, QueryStream, SelectOptions};
pub use store::{EntityStore, StoreSnapshot};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::Entity;
    use fusion_core::{EntityId, EntityType, Version};

    /// Minimal record for exercising the store without domain payloads.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Widget {
        pub id: EntityId,
        pub name: String,
        pub version: Option<Version>,
    }

    impl Widget {
        pub fn new(id: EntityId, name: &str) -> Self {
            Self {
                id,
                name: name.to_string(),
                version: None,
            }
        }

        pub fn with_version(mut self, version: Version) -> Self {
            self.version = Some(version);
            self
        }
    }

    impl Entity for Widget {
        type Id = EntityId;

        fn entity_type() -> EntityType {
            EntityType::Asset
        }

        fn entity_id(&self) -> EntityId {
            self.id
        }

        fn version(&self) -> Option<Version> {
            self.version
        }
    }
}
