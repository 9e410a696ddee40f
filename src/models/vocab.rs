//! Closed and semi-closed vocabularies for record metadata.
//!
//! Strings stored in the database are parsed into these variants at read time.
//! Anything that does not parse is carried through as an unknown value holding
//! the raw string so that display code can still pass it along.

use serde::{Deserialize, Serialize};

/// Neutral fallback color for values with no table entry.
pub const FALLBACK_COLOR: &str = "#CCCCCC";

/// Strip a trailing " – description" or " - description" suffix and trim.
pub fn strip_description(raw: &str) -> &str {
    let cut = [" – ", " - "]
        .iter()
        .filter_map(|sep| raw.find(sep))
        .min()
        .unwrap_or(raw.len());
    raw[..cut].trim()
}

/// Normalize a climate cell to its bare alphanumeric code.
///
/// `"Cfa – Humid subtropical"` and `" cfa "` both become `"Cfa"`/`"cfa"`;
/// comparison against codes is case-insensitive.
pub fn normalize_climate(raw: &str) -> String {
    strip_description(raw)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Köppen climate codes accepted as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClimateCode {
    Af,
    Am,
    Aw,
    BWh,
    BWk,
    BSh,
    BSk,
    Cfa,
    Cfb,
    Cfc,
    Csa,
    Csb,
    Cwa,
    Cwb,
    Cwc,
    Dfa,
    Dfb,
    Dfc,
    Dfd,
    Dwa,
    Dwb,
    Dwc,
    Dwd,
    ET,
    EF,
    /// Varies / multiple climates.
    Var,
}

impl ClimateCode {
    pub const ALL: [ClimateCode; 26] = [
        Self::Af,
        Self::Am,
        Self::Aw,
        Self::BWh,
        Self::BWk,
        Self::BSh,
        Self::BSk,
        Self::Cfa,
        Self::Cfb,
        Self::Cfc,
        Self::Csa,
        Self::Csb,
        Self::Cwa,
        Self::Cwb,
        Self::Cwc,
        Self::Dfa,
        Self::Dfb,
        Self::Dfc,
        Self::Dfd,
        Self::Dwa,
        Self::Dwb,
        Self::Dwc,
        Self::Dwd,
        Self::ET,
        Self::EF,
        Self::Var,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Af => "Af",
            Self::Am => "Am",
            Self::Aw => "Aw",
            Self::BWh => "BWh",
            Self::BWk => "BWk",
            Self::BSh => "BSh",
            Self::BSk => "BSk",
            Self::Cfa => "Cfa",
            Self::Cfb => "Cfb",
            Self::Cfc => "Cfc",
            Self::Csa => "Csa",
            Self::Csb => "Csb",
            Self::Cwa => "Cwa",
            Self::Cwb => "Cwb",
            Self::Cwc => "Cwc",
            Self::Dfa => "Dfa",
            Self::Dfb => "Dfb",
            Self::Dfc => "Dfc",
            Self::Dfd => "Dfd",
            Self::Dwa => "Dwa",
            Self::Dwb => "Dwb",
            Self::Dwc => "Dwc",
            Self::Dwd => "Dwd",
            Self::ET => "ET",
            Self::EF => "EF",
            Self::Var => "Var",
        }
    }

    /// Parse a code case-insensitively. Description suffixes are tolerated.
    pub fn from_str(s: &str) -> Option<Self> {
        let code = normalize_climate(s);
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(&code))
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Af => "Tropical rainforest",
            Self::Am => "Tropical monsoon",
            Self::Aw => "Tropical savanna",
            Self::BWh => "Hot desert",
            Self::BWk => "Cold desert",
            Self::BSh => "Hot semi-arid",
            Self::BSk => "Cold semi-arid",
            Self::Cfa => "Humid subtropical",
            Self::Cfb => "Temperate oceanic",
            Self::Cfc => "Subpolar oceanic",
            Self::Csa => "Hot-summer Mediterranean",
            Self::Csb => "Warm-summer Mediterranean",
            Self::Cwa => "Monsoon-influenced humid subtropical",
            Self::Cwb => "Subtropical highland",
            Self::Cwc => "Cold subtropical highland",
            Self::Dfa => "Hot-summer humid continental",
            Self::Dfb => "Warm-summer humid continental",
            Self::Dfc => "Subarctic",
            Self::Dfd => "Extremely cold subarctic",
            Self::Dwa => "Monsoon-influenced hot-summer humid continental",
            Self::Dwb => "Monsoon-influenced warm-summer humid continental",
            Self::Dwc => "Monsoon-influenced subarctic",
            Self::Dwd => "Monsoon-influenced extremely cold subarctic",
            Self::ET => "Tundra",
            Self::EF => "Ice cap",
            Self::Var => "Varies / Multiple Climates",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Af => "#0000FF",
            Self::Am => "#0078FF",
            Self::Aw => "#46AAFA",
            Self::BWh => "#FF0000",
            Self::BWk => "#FF9696",
            Self::BSh => "#F5A500",
            Self::BSk => "#FFDC64",
            Self::Csa => "#FFFF00",
            Self::Csb => "#C8C800",
            Self::Cwa => "#96FF96",
            Self::Cwb => "#64C864",
            Self::Cwc => "#329632",
            Self::Cfa => "#C8FF50",
            Self::Cfb => "#64FF50",
            Self::Cfc => "#32C800",
            Self::Dfa => "#00FFFF",
            Self::Dfb => "#37C8FF",
            Self::Dfc => "#007D7D",
            Self::Dfd => "#00465F",
            Self::Dwa => "#AAAFFF",
            Self::Dwb => "#5A78DC",
            Self::Dwc => "#4B50B4",
            Self::Dwd => "#320087",
            Self::ET => "#B2B2B2",
            Self::EF => "#666666",
            Self::Var => "#A0A0A0",
        }
    }

    /// Input label shown in pickers, e.g. `"Csa – Hot-summer Mediterranean"`.
    pub fn label(&self) -> String {
        format!("{} – {}", self.as_str(), self.description())
    }
}

/// A climate value read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Climate {
    Known(ClimateCode),
    Unknown(String),
}

impl Climate {
    pub fn parse(raw: &str) -> Self {
        match ClimateCode::from_str(raw) {
            Some(code) => Self::Known(code),
            None => Self::Unknown(raw.to_string()),
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Known(code) => code.color(),
            Self::Unknown(_) => FALLBACK_COLOR,
        }
    }
}

/// Spatial scale levels, ordered from largest to smallest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScaleLevel {
    MultiNational,
    National,
    Regional,
    StateProvince,
    CountyMunicipal,
    MultiCities,
    Urban,
    District,
    Neighborhood,
    Block,
}

impl ScaleLevel {
    pub const ALL: [ScaleLevel; 10] = [
        Self::MultiNational,
        Self::National,
        Self::Regional,
        Self::StateProvince,
        Self::CountyMunicipal,
        Self::MultiCities,
        Self::Urban,
        Self::District,
        Self::Neighborhood,
        Self::Block,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultiNational => "Multi-National",
            Self::National => "National",
            Self::Regional => "Regional",
            Self::StateProvince => "State/Province",
            Self::CountyMunicipal => "County/Municipal",
            Self::MultiCities => "Multi-Cities",
            Self::Urban => "Urban",
            Self::District => "District",
            Self::Neighborhood => "Neighborhood",
            Self::Block => "Block",
        }
    }

    /// Match the first level whose name occurs in `raw` (case-insensitive).
    ///
    /// Order matters: "Multi-National" must be tried before "National".
    pub fn classify(raw: &str) -> Option<Self> {
        let lower = raw.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|level| lower.contains(&level.as_str().to_lowercase()))
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::MultiNational => "#105e8d",
            Self::National => "#266e99",
            Self::Regional => "#3b7ea5",
            Self::StateProvince => "#518eb2",
            Self::CountyMunicipal => "#669ebe",
            Self::MultiCities => "#7caeca",
            Self::Urban => "#91bed6",
            Self::District => "#a7cee3",
            Self::Neighborhood => "#bcdeef",
            Self::Block => "#d2eefb",
        }
    }
}

/// Building use categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingUse {
    Residential,
    Commercial,
    MixedUse,
    Office,
    Retail,
    Industrial,
    Educational,
    Healthcare,
    Public,
    Religious,
    Transport,
    Agricultural,
    Other,
}

impl BuildingUse {
    pub const ALL: [BuildingUse; 13] = [
        Self::Residential,
        Self::Commercial,
        Self::MixedUse,
        Self::Office,
        Self::Retail,
        Self::Industrial,
        Self::Educational,
        Self::Healthcare,
        Self::Public,
        Self::Religious,
        Self::Transport,
        Self::Agricultural,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Residential => "Residential",
            Self::Commercial => "Commercial",
            Self::MixedUse => "Mixed use",
            Self::Office => "Office",
            Self::Retail => "Retail",
            Self::Industrial => "Industrial",
            Self::Educational => "Educational",
            Self::Healthcare => "Healthcare",
            Self::Public => "Public",
            Self::Religious => "Religious",
            Self::Transport => "Transport",
            Self::Agricultural => "Agricultural",
            Self::Other => "Other",
        }
    }

    pub fn classify(raw: &str) -> Option<Self> {
        let lower = raw.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|u| lower.contains(&u.as_str().to_lowercase()))
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Residential => "#FFFF00",
            Self::Commercial => "#FF0000",
            Self::MixedUse => "#B958FF",
            Self::Office => "#6C5B7B",
            Self::Retail => "#F08A5D",
            Self::Industrial => "#B83B5E",
            Self::Educational => "#45B7D1",
            Self::Healthcare => "#96CEB4",
            Self::Public => "#A8E6CF",
            Self::Religious => "#FFB347",
            Self::Transport => "#4D96FF",
            Self::Agricultural => "#6BCB77",
            Self::Other => "#9B9B9B",
        }
    }
}

/// Analysis approach categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Approach {
    Hybrid,
    TopDown,
    BottomUp,
    MixedMethods,
    Empirical,
    Simulation,
    Statistical,
    Review,
}

impl Approach {
    pub const ALL: [Approach; 8] = [
        Self::Hybrid,
        Self::TopDown,
        Self::BottomUp,
        Self::MixedMethods,
        Self::Empirical,
        Self::Simulation,
        Self::Statistical,
        Self::Review,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hybrid => "Hybrid",
            Self::TopDown => "Top-down",
            Self::BottomUp => "Bottom-up",
            Self::MixedMethods => "Mixed-methods",
            Self::Empirical => "Empirical",
            Self::Simulation => "Simulation",
            Self::Statistical => "Statistical",
            Self::Review => "Review",
        }
    }

    pub fn classify(raw: &str) -> Option<Self> {
        let lower = raw.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|a| lower.contains(&a.as_str().to_lowercase()))
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Hybrid => "#2481A1",
            Self::TopDown => "#1E57F2",
            Self::BottomUp => "#46C9F9",
            Self::MixedMethods => "#7B68EE",
            Self::Empirical => "#2E8B57",
            Self::Simulation => "#FF8C00",
            Self::Statistical => "#8B4513",
            Self::Review => "#708090",
        }
    }
}

/// Moderator dimension used to group records in an analysis chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Moderator {
    Climate,
    Scale,
    BuildingUse,
    Approach,
}

impl Moderator {
    /// Display name, also the stored `analysis_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Climate => "Climate",
            Self::Scale => "Scale",
            Self::BuildingUse => "Building Use",
            Self::Approach => "Approach",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "climate" => Some(Self::Climate),
            "scale" => Some(Self::Scale),
            "building use" => Some(Self::BuildingUse),
            "approach" => Some(Self::Approach),
            _ => None,
        }
    }

    /// Bar color for a moderator value.
    pub fn color_for(&self, value: &str) -> &'static str {
        match self {
            Self::Climate => Climate::parse(value).color(),
            Self::Scale => ScaleLevel::classify(value)
                .map(|s| s.color())
                .unwrap_or(FALLBACK_COLOR),
            Self::BuildingUse => BuildingUse::classify(value)
                .map(|u| u.color())
                .unwrap_or(FALLBACK_COLOR),
            Self::Approach => Approach::classify(value)
                .map(|a| a.color())
                .unwrap_or(FALLBACK_COLOR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_description() {
        assert_eq!(strip_description("Cfa – Humid subtropical"), "Cfa");
        assert_eq!(strip_description("Urban - city wide"), "Urban");
        assert_eq!(strip_description("Top-down"), "Top-down");
        assert_eq!(strip_description("  Block  "), "Block");
    }

    #[test]
    fn test_climate_code_parse() {
        assert_eq!(ClimateCode::from_str("cfa"), Some(ClimateCode::Cfa));
        assert_eq!(
            ClimateCode::from_str("BWh – Hot desert"),
            Some(ClimateCode::BWh)
        );
        assert_eq!(ClimateCode::from_str("Tropical"), None);
        assert_eq!(
            Climate::parse("Zz"),
            Climate::Unknown("Zz".to_string())
        );
    }

    #[test]
    fn test_scale_classify_prefers_multi_national() {
        assert_eq!(
            ScaleLevel::classify("Multi-National"),
            Some(ScaleLevel::MultiNational)
        );
        assert_eq!(ScaleLevel::classify("national"), Some(ScaleLevel::National));
        assert_eq!(ScaleLevel::classify("Blocks"), Some(ScaleLevel::Block));
    }

    #[test]
    fn test_moderator_colors() {
        assert_eq!(Moderator::Climate.color_for("Csa"), "#FFFF00");
        assert_eq!(Moderator::BuildingUse.color_for("residential"), "#FFFF00");
        assert_eq!(
            Moderator::Approach.color_for("Hybrid (combined top-down and bottom-up)"),
            "#2481A1"
        );
        assert_eq!(Moderator::Scale.color_for("Galaxy"), FALLBACK_COLOR);
    }

    #[test]
    fn test_moderator_from_str() {
        assert_eq!(Moderator::from_str("building_use"), Some(Moderator::BuildingUse));
        assert_eq!(Moderator::from_str("Building Use"), Some(Moderator::BuildingUse));
        assert_eq!(Moderator::from_str("weather"), None);
    }
}
