//! Filter axes and the per-record values they look at.

use serde::{Deserialize, Serialize};

use crate::models::vocab::{normalize_climate, ClimateCode};
use crate::models::{Direction, Record, AWAITING_DATA};

/// A filter axis, in cascade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Criteria,
    EnergyMethod,
    Direction,
    Scale,
    Climate,
    Location,
    BuildingUse,
    Approach,
}

impl Facet {
    pub const ALL: [Facet; 8] = [
        Self::Criteria,
        Self::EnergyMethod,
        Self::Direction,
        Self::Scale,
        Self::Climate,
        Self::Location,
        Self::BuildingUse,
        Self::Approach,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Criteria => "criteria",
            Self::EnergyMethod => "energy_method",
            Self::Direction => "direction",
            Self::Scale => "scale",
            Self::Climate => "climate",
            Self::Location => "location",
            Self::BuildingUse => "building_use",
            Self::Approach => "approach",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "criteria" | "determinant" => Some(Self::Criteria),
            "energy_method" | "energy_output" => Some(Self::EnergyMethod),
            "direction" => Some(Self::Direction),
            "scale" | "scales" => Some(Self::Scale),
            "climate" | "climates" => Some(Self::Climate),
            "location" | "locations" => Some(Self::Location),
            "building_use" | "building_uses" => Some(Self::BuildingUse),
            "approach" | "approaches" => Some(Self::Approach),
            _ => None,
        }
    }

    /// Multi-select axes accept several values, matched as a union.
    pub fn is_multi(&self) -> bool {
        !matches!(self, Self::Criteria | Self::EnergyMethod | Self::Direction)
    }

    /// The value this facet offers for a record, if the record contributes one.
    ///
    /// Climate collapses to the canonical code and only vocabulary codes count;
    /// scale never offers the awaiting-data placeholder.
    pub fn option_value(&self, record: &Record) -> Option<String> {
        let non_empty = |v: Option<&str>| {
            v.filter(|s| !s.trim().is_empty())
                .map(|s| s.to_string())
        };
        match self {
            Self::Criteria => non_empty(Some(record.criteria.trim())),
            Self::EnergyMethod => non_empty(Some(&record.energy_method)),
            Self::Direction => record.direction_kind().map(|d| d.as_str().to_string()),
            Self::Scale => non_empty(record.scale.as_deref())
                .filter(|s| s.trim() != AWAITING_DATA),
            Self::Climate => record
                .climate_code()
                .and_then(|code| ClimateCode::from_str(&code))
                .map(|code| code.as_str().to_string()),
            Self::Location => non_empty(record.location.as_deref()),
            Self::BuildingUse => non_empty(record.building_use.as_deref()),
            Self::Approach => non_empty(record.approach.as_deref()),
        }
    }

    /// Whether a record matches a selected value on this axis.
    pub fn matches(&self, record: &Record, selected: &str) -> bool {
        match self {
            Self::Criteria => record.criteria.trim() == selected.trim(),
            Self::EnergyMethod => record.energy_method == selected,
            Self::Direction => record.direction == selected,
            Self::Scale => record.scale.as_deref() == Some(selected),
            Self::Climate => {
                let wanted = normalize_climate(selected);
                record
                    .climate_code()
                    .is_some_and(|code| code.eq_ignore_ascii_case(&wanted))
            }
            Self::Location => record.location.as_deref() == Some(selected),
            Self::BuildingUse => record.building_use.as_deref() == Some(selected),
            Self::Approach => record.approach.as_deref() == Some(selected),
        }
    }

    /// Whether a selected value is acceptable input for this axis.
    pub fn accepts(&self, selected: &str) -> bool {
        match self {
            Self::Direction => Direction::from_str(selected).is_some(),
            Self::Climate => ClimateCode::from_str(selected).is_some(),
            _ => !selected.trim().is_empty(),
        }
    }

    /// Whether two values name the same option on this axis.
    pub fn same_value(&self, a: &str, b: &str) -> bool {
        match self {
            Self::Climate => normalize_climate(a).eq_ignore_ascii_case(&normalize_climate(b)),
            Self::Criteria => a.trim() == b.trim(),
            _ => a == b,
        }
    }
}

/// One entry of a facet's option list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetOption {
    pub value: String,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRecord;

    fn record(climate: Option<&str>, scale: Option<&str>) -> Record {
        NewRecord {
            criteria: " Density ".to_string(),
            energy_method: "EUI".to_string(),
            direction: "Increase".to_string(),
            climate: climate.map(str::to_string),
            scale: scale.map(str::to_string),
            ..Default::default()
        }
        .into_record(1, String::new())
    }

    #[test]
    fn test_climate_option_is_canonical_code() {
        let r = record(Some("cfa – Humid subtropical"), None);
        assert_eq!(Facet::Climate.option_value(&r).as_deref(), Some("Cfa"));
        assert!(Facet::Climate.matches(&r, "CFA"));
        assert!(!Facet::Climate.matches(&r, "Cfb"));

        let outside = record(Some("Tropical"), None);
        assert_eq!(Facet::Climate.option_value(&outside), None);
    }

    #[test]
    fn test_scale_placeholder_not_offered() {
        assert_eq!(
            Facet::Scale.option_value(&record(None, Some(AWAITING_DATA))),
            None
        );
        assert_eq!(Facet::Scale.option_value(&record(None, Some("  "))), None);
        assert_eq!(
            Facet::Scale.option_value(&record(None, Some("Urban"))).as_deref(),
            Some("Urban")
        );
    }

    #[test]
    fn test_criteria_trimmed() {
        let r = record(None, None);
        assert_eq!(Facet::Criteria.option_value(&r).as_deref(), Some("Density"));
        assert!(Facet::Criteria.matches(&r, "Density"));
    }

    #[test]
    fn test_facet_names() {
        for facet in Facet::ALL {
            assert_eq!(Facet::from_str(facet.as_str()), Some(facet));
        }
        assert_eq!(Facet::from_str("Building Use"), Some(Facet::BuildingUse));
        assert!(Facet::Climate.is_multi());
        assert!(!Facet::Direction.is_multi());
    }
}
