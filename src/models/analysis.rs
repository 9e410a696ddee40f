//! Moderator analysis data model and its persisted snapshot.

use serde::{Deserialize, Serialize};

use super::vocab::Moderator;

/// Energy label stored for an empty chart half.
pub const NONE_ENERGY: &str = "None";

/// Sentinel selecting every increase-direction energy output.
pub const ALL_INCREASE: &str = "ALL ENERGY OUTPUTS (INCREASE)";
/// Sentinel selecting every decrease-direction energy output.
pub const ALL_DECREASE: &str = "ALL ENERGY OUTPUTS (DECREASE)";

/// One stacked group: moderator value and how many bars it contributes.
pub type Tally = (String, i64);

/// Energy output selection for one half of the chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnergySelection {
    /// Empty half.
    None,
    /// Every record of the half's direction.
    All,
    /// Records whose energy output contains this text (case-insensitive).
    Specific(String),
}

impl EnergySelection {
    /// Parse a selector; both `ALL ENERGY OUTPUTS (...)` sentinels mean `All`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::None,
            Some(s) if s.eq_ignore_ascii_case(NONE_ENERGY) => Self::None,
            Some(s) if s == ALL_INCREASE || s == ALL_DECREASE => Self::All,
            Some(s) => Self::Specific(s.to_string()),
        }
    }

    pub fn matches(&self, energy_method: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Specific(sel) => energy_method
                .to_lowercase()
                .contains(&sel.to_lowercase()),
        }
    }

    /// Label used on the chart arrow for this half.
    pub fn label(&self, sentinel: &str) -> String {
        match self {
            Self::None => NONE_ENERGY.to_string(),
            Self::All => sentinel.to_string(),
            Self::Specific(s) => s.clone(),
        }
    }
}

/// Direction-split, count-keyed chart data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisModel {
    pub determinant: String,
    pub moderator: Moderator,
    pub top_energy: String,
    pub bottom_energy: String,
    pub top_sorted: Vec<Tally>,
    pub bottom_sorted: Vec<Tally>,
    pub top_height: i64,
    pub bottom_height: i64,
}

impl AnalysisModel {
    pub fn is_empty(&self) -> bool {
        self.top_sorted.is_empty() && self.bottom_sorted.is_empty()
    }
}

/// Persisted analysis owned by a user.
///
/// Legacy rows may lack the sorted tallies; only the cached HTML survives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedAnalysis {
    pub id: i64,
    pub user_id: i64,
    pub analysis_type: String,
    pub determinant: String,
    pub top_energy: Option<String>,
    pub bottom_energy: Option<String>,
    pub top_sorted: Option<Vec<Tally>>,
    pub bottom_sorted: Option<Vec<Tally>>,
    pub top_height: Option<i64>,
    pub bottom_height: Option<i64>,
    pub html: Option<String>,
    pub created_at: String,
}

impl SavedAnalysis {
    /// Reconstruct the chart model from stored fields, if they are all present.
    pub fn model(&self) -> Option<AnalysisModel> {
        let top_sorted = self.top_sorted.clone()?;
        let bottom_sorted = self.bottom_sorted.clone()?;
        Some(AnalysisModel {
            determinant: self.determinant.clone(),
            moderator: Moderator::from_str(&self.analysis_type)?,
            top_energy: self
                .top_energy
                .clone()
                .unwrap_or_else(|| NONE_ENERGY.to_string()),
            bottom_energy: self
                .bottom_energy
                .clone()
                .unwrap_or_else(|| NONE_ENERGY.to_string()),
            top_height: self
                .top_height
                .unwrap_or_else(|| top_sorted.iter().map(|(_, c)| c).sum()),
            bottom_height: self
                .bottom_height
                .unwrap_or_else(|| bottom_sorted.iter().map(|(_, c)| c).sum()),
            top_sorted,
            bottom_sorted,
        })
    }
}

/// Snapshot to persist for a user.
#[derive(Debug, Clone)]
pub struct NewSavedAnalysis {
    pub user_id: i64,
    pub model: AnalysisModel,
    pub html: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_selection_parse() {
        assert_eq!(EnergySelection::parse(None), EnergySelection::None);
        assert_eq!(EnergySelection::parse(Some("None")), EnergySelection::None);
        assert_eq!(
            EnergySelection::parse(Some(ALL_INCREASE)),
            EnergySelection::All
        );
        assert!(EnergySelection::parse(Some("eui")).matches("Site EUI (kWh/m2)"));
        assert!(!EnergySelection::None.matches("EUI"));
    }

    #[test]
    fn test_legacy_row_has_no_model() {
        let saved = SavedAnalysis {
            id: 1,
            user_id: 1,
            analysis_type: "Climate".to_string(),
            determinant: "Density".to_string(),
            top_energy: Some("EUI".to_string()),
            bottom_energy: None,
            top_sorted: None,
            bottom_sorted: None,
            top_height: None,
            bottom_height: None,
            html: Some("<div></div>".to_string()),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };
        assert!(saved.model().is_none());

        let full = SavedAnalysis {
            top_sorted: Some(vec![("Cfa".to_string(), 2)]),
            bottom_sorted: Some(vec![]),
            ..saved
        };
        let model = full.model().unwrap();
        assert_eq!(model.top_height, 2);
        assert_eq!(model.bottom_energy, NONE_ENERGY);
    }
}
