//! Direction-split moderator tallies for one determinant.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::vocab::strip_description;
use crate::models::{
    AnalysisModel, Direction, EnergySelection, Moderator, Record, Tally, ALL_DECREASE,
    ALL_INCREASE, AWAITING_DATA,
};
use crate::repository::{RecordQuery, RecordStore};

/// Parameters of one chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub determinant: String,
    pub moderator: Moderator,
    /// Energy output for the increase half; `None` leaves it empty.
    #[serde(default)]
    pub top_energy: Option<String>,
    #[serde(default)]
    pub bottom_energy: Option<String>,
}

fn moderator_value(record: &Record, moderator: Moderator) -> Option<&str> {
    match moderator {
        Moderator::Climate => record.climate.as_deref(),
        Moderator::Scale => record.scale.as_deref(),
        Moderator::BuildingUse => record.building_use.as_deref(),
        Moderator::Approach => record.approach.as_deref(),
    }
}

/// Count records per moderator value for one half of the chart.
///
/// Values are keyed on their normalized text, so `Cfa` and `cfa` count
/// separately. The result is ordered by count descending, then value ascending.
pub fn tally(
    records: &[Record],
    moderator: Moderator,
    direction: Direction,
    selection: &EnergySelection,
) -> Vec<Tally> {
    if *selection == EnergySelection::None {
        return Vec::new();
    }

    let mut counts: HashMap<String, i64> = HashMap::new();
    for record in records {
        if record.direction_kind() != Some(direction) || !selection.matches(&record.energy_method)
        {
            continue;
        }
        let Some(raw) = moderator_value(record, moderator) else {
            continue;
        };
        let value = strip_description(raw);
        if value.is_empty() || value.eq_ignore_ascii_case(AWAITING_DATA) {
            continue;
        }
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }

    let mut sorted: Vec<Tally> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}

/// Build the chart model from the records of one determinant.
pub fn build_model(records: &[Record], request: &AnalysisRequest) -> AnalysisModel {
    let top = EnergySelection::parse(request.top_energy.as_deref());
    let bottom = EnergySelection::parse(request.bottom_energy.as_deref());
    let top_sorted = tally(records, request.moderator, Direction::Increase, &top);
    let bottom_sorted = tally(records, request.moderator, Direction::Decrease, &bottom);

    AnalysisModel {
        determinant: request.determinant.trim().to_string(),
        moderator: request.moderator,
        top_energy: top.label(ALL_INCREASE),
        bottom_energy: bottom.label(ALL_DECREASE),
        top_height: top_sorted.iter().map(|(_, c)| c).sum(),
        bottom_height: bottom_sorted.iter().map(|(_, c)| c).sum(),
        top_sorted,
        bottom_sorted,
    }
}

/// Loads records for a determinant and tallies them.
#[derive(Clone)]
pub struct AnalysisBuilder {
    store: Arc<dyn RecordStore>,
}

impl AnalysisBuilder {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn build(&self, request: &AnalysisRequest) -> AppResult<AnalysisModel> {
        if request.determinant.trim().is_empty() {
            return Err(AppError::Validation("Choose a determinant".to_string()));
        }
        let records = self
            .store
            .fetch(&RecordQuery::visible().with_criteria(&request.determinant))
            .await?;
        let model = build_model(&records, request);
        debug!(
            "Analysis for {:?} by {}: {} top bars, {} bottom bars",
            model.determinant,
            model.moderator.as_str(),
            model.top_height,
            model.bottom_height
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRecordStore;

    fn record(id: i64, direction: &str, energy: &str, climate: Option<&str>) -> Record {
        Record {
            id,
            group_id: None,
            criteria: "Compactness".to_string(),
            energy_method: energy.to_string(),
            direction: direction.to_string(),
            paragraph: Some("text".to_string()),
            status: None,
            user: None,
            scale: None,
            climate: climate.map(str::to_string),
            location: None,
            building_use: None,
            approach: None,
            sample_size: None,
            created_at: None,
        }
    }

    fn request(top: Option<&str>, bottom: Option<&str>) -> AnalysisRequest {
        AnalysisRequest {
            determinant: "Compactness".to_string(),
            moderator: Moderator::Climate,
            top_energy: top.map(str::to_string),
            bottom_energy: bottom.map(str::to_string),
        }
    }

    #[test]
    fn test_tally_sorted_by_count() {
        let records = vec![
            record(1, "Increase", "EUI", Some("Cfa")),
            record(2, "Increase", "EUI", Some("Cwa")),
            record(3, "Increase", "Site EUI", Some("Cfa – Humid subtropical")),
            record(4, "Increase", "EUI", Some("Cfa")),
            record(5, "Decrease", "EUI", Some("Cfa")),
            record(6, "Increase", "Heating", Some("Cfa")),
        ];
        let model = build_model(&records, &request(Some("EUI"), None));
        assert_eq!(
            model.top_sorted,
            vec![("Cfa".to_string(), 3), ("Cwa".to_string(), 1)]
        );
        assert_eq!(model.top_height, 4);
        assert!(model.bottom_sorted.is_empty());
        assert_eq!(model.bottom_energy, "None");
    }

    #[test]
    fn test_ties_break_on_display() {
        let records = vec![
            record(1, "Decrease", "EUI", Some("Dfb")),
            record(2, "Decrease", "EUI", Some("Bsk")),
            record(3, "Decrease", "EUI", Some("")),
            record(4, "Decrease", "EUI", Some("Awaiting data")),
            record(5, "Decrease", "EUI", None),
        ];
        let model = build_model(&records, &request(None, Some(ALL_DECREASE)));
        assert_eq!(
            model.bottom_sorted,
            vec![("Bsk".to_string(), 1), ("Dfb".to_string(), 1)]
        );
        assert_eq!(model.bottom_energy, ALL_DECREASE);
    }

    #[test]
    fn test_spellings_tally_separately() {
        let records = vec![
            record(1, "Increase", "EUI", Some("Cfa")),
            record(2, "Increase", "EUI", Some("cfa")),
            record(3, "Increase", "EUI", Some(" Cfa ")),
        ];
        let model = build_model(&records, &request(Some(ALL_INCREASE), None));
        assert_eq!(
            model.top_sorted,
            vec![("Cfa".to_string(), 2), ("cfa".to_string(), 1)]
        );
        assert_eq!(model.top_height, 3);
    }

    #[tokio::test]
    async fn test_builder_fetches_determinant_only() {
        let mut other = record(9, "Increase", "EUI", Some("Af"));
        other.criteria = "Density".to_string();
        let store = MemoryRecordStore::with_records(vec![
            record(1, "Increase", "EUI", Some("Cfa")),
            other,
        ]);
        let builder = AnalysisBuilder::new(Arc::new(store));

        let model = builder.build(&request(Some(ALL_INCREASE), None)).await.unwrap();
        assert_eq!(model.top_sorted, vec![("Cfa".to_string(), 1)]);

        let err = builder
            .build(&AnalysisRequest {
                determinant: " ".to_string(),
                ..request(None, None)
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
