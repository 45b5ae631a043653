//! Core entity structures
//!
//! Wire format follows the REST backend: camelCase field names, numeric ids,
//! optional `version` tokens.

use crate::{EntityId, OispAlertPriority, Version};
use serde::{Deserialize, Serialize};

/// Company - top-level tenant owning factory sites and assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_key: Option<String>,
    #[serde(default)]
    pub version: Option<Version>,
}

/// Room inside a factory site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: EntityId,
    pub factory_site_id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<Version>,
}

/// Factory site of a company.
///
/// `rooms` is only populated when the site was requested with
/// `embedChildren=true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorySite {
    pub id: EntityId,
    pub company_id: EntityId,
    pub name: String,
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub version: Option<Version>,
}

/// Asset instance. `subsystem_ids` lists child assets in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: EntityId,
    pub company_id: EntityId,
    #[serde(default)]
    pub asset_series_id: Option<EntityId>,
    #[serde(default)]
    pub room_id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub external_name: Option<String>,
    #[serde(default)]
    pub subsystem_ids: Vec<EntityId>,
    #[serde(default)]
    pub version: Option<Version>,
}

impl Asset {
    /// Create a bare asset, mostly useful for drafts and fixtures.
    pub fn new(id: EntityId, company_id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            company_id,
            asset_series_id: None,
            room_id: None,
            name: name.into(),
            description: None,
            external_name: None,
            subsystem_ids: Vec::new(),
            version: None,
        }
    }

    /// Set the ordered child asset ids.
    pub fn with_subsystems(mut self, subsystem_ids: Vec<EntityId>) -> Self {
        self.subsystem_ids = subsystem_ids;
        self
    }
}

/// Asset as seen from the factory manager, including alert state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryAssetDetails {
    #[serde(flatten)]
    pub asset: Asset,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub asset_series_name: String,
    #[serde(default)]
    pub asset_type_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub room_name: String,
    #[serde(default)]
    pub factory_site_name: String,
    #[serde(default)]
    pub open_alert_priority: Option<OispAlertPriority>,
    #[serde(default)]
    pub protocol: Option<String>,
}

impl FactoryAssetDetails {
    pub fn from_asset(asset: Asset) -> Self {
        Self {
            asset,
            manufacturer: String::new(),
            asset_series_name: String::new(),
            asset_type_name: String::new(),
            category: String::new(),
            room_name: String::new(),
            factory_site_name: String::new(),
            open_alert_priority: None,
            protocol: None,
        }
    }
}

/// Asset as seen from the fleet manager (no alert state).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetAssetDetails {
    #[serde(flatten)]
    pub asset: Asset,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub asset_series_name: String,
    #[serde(default)]
    pub asset_type_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub room_name: String,
    #[serde(default)]
    pub factory_site_name: String,
}

/// Lower and upper bound configured on a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threshold {
    #[serde(default)]
    pub value_lower: Option<f64>,
    #[serde(default)]
    pub value_upper: Option<f64>,
}

/// Sensor field of an asset with its latest value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDetails {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub external_name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub absolute_threshold: Option<Threshold>,
}

impl FieldDetails {
    pub fn new(id: EntityId, name: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            id,
            name: name.into(),
            external_name: None,
            value: value.map(str::to_string),
            unit: None,
            absolute_threshold: None,
        }
    }

    /// Numeric reading of the field, if the value parses as a number.
    pub fn numeric_value(&self) -> Option<f64> {
        self.value
            .as_deref()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| !v.is_nan())
    }
}

/// Factory asset details together with their field readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryAssetDetailsWithFields {
    #[serde(flatten)]
    pub details: FactoryAssetDetails,
    #[serde(default)]
    pub fields: Vec<FieldDetails>,
}
