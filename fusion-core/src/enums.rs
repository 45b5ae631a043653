//! Enum types for Fusion entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity type discriminator, used in log fields and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Company,
    FactorySite,
    Room,
    Asset,
    AssetSeries,
    FactoryAssetDetails,
    FleetAssetDetails,
    Field,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            EntityType::Company => "Company",
            EntityType::FactorySite => "FactorySite",
            EntityType::Room => "Room",
            EntityType::Asset => "Asset",
            EntityType::AssetSeries => "AssetSeries",
            EntityType::FactoryAssetDetails => "FactoryAssetDetails",
            EntityType::FleetAssetDetails => "FleetAssetDetails",
            EntityType::Field => "Field",
        };
        write!(f, "{}", value)
    }
}

/// Priority of an open OISP alert on an asset.
///
/// Ordering follows severity rank: `Urgent < High < Medium < Low`, so the
/// minimum of a set of priorities is the most severe one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OispAlertPriority {
    Urgent,
    High,
    Medium,
    Low,
}

impl OispAlertPriority {
    /// Severity rank, lower is more severe.
    pub fn as_number(&self) -> u8 {
        match self {
            OispAlertPriority::Urgent => 1,
            OispAlertPriority::High => 2,
            OispAlertPriority::Medium => 3,
            OispAlertPriority::Low => 4,
        }
    }

    pub fn as_wire_str(&self) -> &'static str {
        match self {
            OispAlertPriority::Urgent => "URGENT",
            OispAlertPriority::High => "HIGH",
            OispAlertPriority::Medium => "MEDIUM",
            OispAlertPriority::Low => "LOW",
        }
    }

    /// Pick the more severe of two optional priorities.
    ///
    /// A missing value never wins over a present one.
    pub fn most_severe(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if b.as_number() < a.as_number() { b } else { a }),
            (Some(a), None) => Some(a),
            (None, b) => b,
        }
    }
}

impl fmt::Display for OispAlertPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire_str())
    }
}

impl FromStr for OispAlertPriority {
    type Err = AlertPriorityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "URGENT" => Ok(OispAlertPriority::Urgent),
            "HIGH" => Ok(OispAlertPriority::High),
            "MEDIUM" => Ok(OispAlertPriority::Medium),
            "LOW" => Ok(OispAlertPriority::Low),
            _ => Err(AlertPriorityParseError(s.to_string())),
        }
    }
}

/// Error when parsing an invalid alert priority string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertPriorityParseError(pub String);

impl fmt::Display for AlertPriorityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid alert priority: {}", self.0)
    }
}

impl std::error::Error for AlertPriorityParseError {}
