//! Records the tree builder can arrange.

use fusion_core::{
    Asset, EntityId, FactoryAssetDetails, FactoryAssetDetailsWithFields, FleetAssetDetails,
    OispAlertPriority,
};

/// A record that names its children by id.
pub trait TreeRecord {
    fn record_id(&self) -> EntityId;

    /// Child ids in display order. Ids missing from the collection are ignored.
    fn subsystem_ids(&self) -> &[EntityId];
}

/// A tree record carrying an open alert.
pub trait AlertRecord: TreeRecord {
    fn open_alert_priority(&self) -> Option<OispAlertPriority>;
}

impl TreeRecord for Asset {
    fn record_id(&self) -> EntityId {
        self.id
    }

    fn subsystem_ids(&self) -> &[EntityId] {
        &self.subsystem_ids
    }
}

impl TreeRecord for FactoryAssetDetails {
    fn record_id(&self) -> EntityId {
        self.asset.id
    }

    fn subsystem_ids(&self) -> &[EntityId] {
        &self.asset.subsystem_ids
    }
}

impl TreeRecord for FactoryAssetDetailsWithFields {
    fn record_id(&self) -> EntityId {
        self.details.record_id()
    }

    fn subsystem_ids(&self) -> &[EntityId] {
        self.details.subsystem_ids()
    }
}

impl TreeRecord for FleetAssetDetails {
    fn record_id(&self) -> EntityId {
        self.asset.id
    }

    fn subsystem_ids(&self) -> &[EntityId] {
        &self.asset.subsystem_ids
    }
}

impl AlertRecord for FactoryAssetDetails {
    fn open_alert_priority(&self) -> Option<OispAlertPriority> {
        self.open_alert_priority
    }
}

impl AlertRecord for FactoryAssetDetailsWithFields {
    fn open_alert_priority(&self) -> Option<OispAlertPriority> {
        self.details.open_alert_priority
    }
}
