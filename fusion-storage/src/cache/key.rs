//! Cache keys.

use std::fmt;

/// What a cache record is keyed by.
///
/// `Entity` keys cache single-record fetches; `Parent` keys cache collection
/// fetches ("all factory sites of company 4") under a caller-chosen string.
/// The two namespaces never collide even when an id renders like a parent key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey<Id> {
    Entity(Id),
    Parent(String),
}

impl<Id> CacheKey<Id> {
    pub fn parent(parent_id: impl Into<String>) -> Self {
        CacheKey::Parent(parent_id.into())
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, CacheKey::Entity(_))
    }
}

impl<Id: fmt::Display> fmt::Display for CacheKey<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Entity(id) => write!(f, "id:{}", id),
            CacheKey::Parent(parent) => write!(f, "parent:{}", parent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_are_distinct() {
        let by_id: CacheKey<String> = CacheKey::Entity("7".to_string());
        let by_parent: CacheKey<String> = CacheKey::parent("7");
        assert_ne!(by_id, by_parent);
        assert!(by_id.is_entity());
        assert!(!by_parent.is_entity());
    }

    #[test]
    fn test_display() {
        assert_eq!(CacheKey::<i64>::Entity(5).to_string(), "id:5");
        assert_eq!(CacheKey::<i64>::parent("company-1").to_string(), "parent:company-1");
    }
}
