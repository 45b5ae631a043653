//! The `Entity` trait that every storable record implements.

use fusion_core::{
    Asset, Company, EntityId, EntityType, FactoryAssetDetails, FactoryAssetDetailsWithFields,
    FactorySite, FleetAssetDetails, Room, Version,
};
use std::fmt;
use std::hash::Hash;

/// Marker trait for records that can live in an [`EntityStore`](crate::EntityStore).
///
/// # Implementation Requirements
///
/// - `entity_type()` must return a consistent value for all instances
/// - `entity_id()` must return the unique identifier for this instance
/// - `version()` returns the optimistic-concurrency token, if the record has one
/// - Implementations must be `Clone + Send + Sync + 'static` so snapshots can
///   be shared with in-flight fetches and query streams
pub trait Entity: Clone + Send + Sync + 'static {
    /// Identifier type. `Ord` keeps snapshots in a stable order.
    type Id: Clone + Eq + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    fn entity_type() -> EntityType;

    fn entity_id(&self) -> Self::Id;

    fn version(&self) -> Option<Version> {
        None
    }
}

// ============================================================================
// IMPLEMENTATIONS FOR FUSION RECORDS
// ============================================================================

impl Entity for Company {
    type Id = EntityId;

    fn entity_type() -> EntityType {
        EntityType::Company
    }

    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn version(&self) -> Option<Version> {
        self.version
    }
}

impl Entity for FactorySite {
    type Id = EntityId;

    fn entity_type() -> EntityType {
        EntityType::FactorySite
    }

    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn version(&self) -> Option<Version> {
        self.version
    }
}

impl Entity for Room {
    type Id = EntityId;

    fn entity_type() -> EntityType {
        EntityType::Room
    }

    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn version(&self) -> Option<Version> {
        self.version
    }
}

impl Entity for Asset {
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

impl Entity for FactoryAssetDetails {
    type Id = EntityId;

    fn entity_type() -> EntityType {
        EntityType::FactoryAssetDetails
    }

    fn entity_id(&self) -> EntityId {
        self.asset.id
    }

    fn version(&self) -> Option<Version> {
        self.asset.version
    }
}

impl Entity for FactoryAssetDetailsWithFields {
    type Id = EntityId;

    fn entity_type() -> EntityType {
        EntityType::FactoryAssetDetails
    }

    fn entity_id(&self) -> EntityId {
        self.details.asset.id
    }

    fn version(&self) -> Option<Version> {
        self.details.asset.version
    }
}

impl Entity for FleetAssetDetails {
    type Id = EntityId;

    fn entity_type() -> EntityType {
        EntityType::FleetAssetDetails
    }

    fn entity_id(&self) -> EntityId {
        self.asset.id
    }

    fn version(&self) -> Option<Version> {
        self.asset.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_types() {
        assert_eq!(Company::entity_type(), EntityType::Company);
        assert_eq!(FactorySite::entity_type(), EntityType::FactorySite);
        assert_eq!(Asset::entity_type(), EntityType::Asset);
        assert_eq!(
            FactoryAssetDetailsWithFields::entity_type(),
            EntityType::FactoryAssetDetails
        );
        assert_eq!(FleetAssetDetails::entity_type(), EntityType::FleetAssetDetails);
    }

    #[test]
    fn test_details_delegate_identity_to_asset() {
        let mut asset = Asset::new(9, 1, "mixer");
        asset.version = Some(4);
        let details = FactoryAssetDetails::from_asset(asset);
        assert_eq!(details.entity_id(), 9);
        assert_eq!(Entity::version(&details), Some(4));
    }
}
