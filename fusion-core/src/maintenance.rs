//! Maintenance thresholds for asset list views.

use crate::FactoryAssetDetailsWithFields;

/// A maintenance countdown field and the value below which it is flagged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaintenanceType {
    /// Field name carrying the countdown, compared case-insensitively.
    pub field_name: &'static str,
    pub lower_threshold: f64,
}

pub const MAINTENANCE_HOURS: MaintenanceType = MaintenanceType {
    field_name: "Operating hours till maintenance",
    lower_threshold: 150.0,
};

pub const MAINTENANCE_DAYS: MaintenanceType = MaintenanceType {
    field_name: "Days till maintenance",
    lower_threshold: 14.0,
};

impl MaintenanceType {
    /// Current countdown value of this maintenance type on the asset.
    pub fn value_of(&self, asset: &FactoryAssetDetailsWithFields) -> Option<f64> {
        asset
            .fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(self.field_name))
            .and_then(|field| field.numeric_value())
    }

    pub fn is_due_soon(&self, asset: &FactoryAssetDetailsWithFields) -> bool {
        self.value_of(asset)
            .is_some_and(|value| value < self.lower_threshold)
    }
}

/// True when either the hours or the days countdown is below its threshold.
pub fn needs_maintenance_soon(asset: &FactoryAssetDetailsWithFields) -> bool {
    MAINTENANCE_HOURS.is_due_soon(asset) || MAINTENANCE_DAYS.is_due_soon(asset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Asset, FactoryAssetDetails, FieldDetails};

    fn asset_with(fields: Vec<FieldDetails>) -> FactoryAssetDetailsWithFields {
        FactoryAssetDetailsWithFields {
            details: FactoryAssetDetails::from_asset(Asset::new(1, 1, "pump")),
            fields,
        }
    }

    #[test]
    fn test_hours_below_threshold_is_due() {
        let asset = asset_with(vec![FieldDetails::new(
            1,
            "operating hours till maintenance",
            Some("120"),
        )]);
        assert_eq!(MAINTENANCE_HOURS.value_of(&asset), Some(120.0));
        assert!(needs_maintenance_soon(&asset));
    }

    #[test]
    fn test_days_at_threshold_is_not_due() {
        let asset = asset_with(vec![FieldDetails::new(2, "Days till maintenance", Some("14"))]);
        assert!(!MAINTENANCE_DAYS.is_due_soon(&asset));
        assert!(!needs_maintenance_soon(&asset));
    }

    #[test]
    fn test_missing_or_non_numeric_value_is_not_due() {
        assert!(!needs_maintenance_soon(&asset_with(vec![])));
        let asset = asset_with(vec![FieldDetails::new(2, "Days till maintenance", Some("soon"))]);
        assert!(!needs_maintenance_soon(&asset));
    }
}
