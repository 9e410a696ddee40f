//! Write spreadsheet metadata onto confirmed match records.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::matcher::MatchCandidate;
use super::normalize::{extract_climate_code, TitleColumn};
use super::table::Table;
use crate::models::RecordPatch;
use crate::repository::RecordStore;

/// Which sheet columns feed which metadata fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub location: Option<usize>,
    pub climate: Option<usize>,
    pub scale: Option<usize>,
    pub building_use: Option<usize>,
    pub approach: Option<usize>,
    pub sample_size: Option<usize>,
}

impl ColumnMap {
    /// Assign each header to the first metadata field whose hint it matches.
    /// The first matching column wins a field; the title column is skipped.
    pub fn detect(headers: &[String], title: &TitleColumn) -> Self {
        let mut map = Self::default();
        for (index, header) in headers.iter().enumerate() {
            if index == title.index {
                continue;
            }
            let h = header.trim().to_lowercase();
            let slot = if ["location", "site", "region"].iter().any(|k| h.contains(k)) {
                &mut map.location
            } else if h.contains("climate") {
                &mut map.climate
            } else if h.contains("scale") {
                &mut map.scale
            } else if h.contains("building") && (h.contains("use") || h.contains("type")) {
                &mut map.building_use
            } else if h.contains("approach") || h.contains("method") {
                &mut map.approach
            } else if h.contains("sample") || h == "n" {
                &mut map.sample_size
            } else {
                continue;
            };
            if slot.is_none() {
                *slot = Some(index);
            }
        }
        map
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Patch for one sheet row. Only mapped columns are written; an empty cell
    /// clears the field and climate cells go through code extraction.
    pub fn patch_for_row(&self, table: &Table, row: usize) -> RecordPatch {
        let text = |col: Option<usize>| {
            col.map(|c| {
                let value = table.cell(row, c).trim();
                (!value.is_empty()).then(|| value.to_string())
            })
        };
        RecordPatch {
            location: text(self.location),
            climate: self
                .climate
                .map(|c| extract_climate_code(table.cell(row, c))),
            scale: text(self.scale),
            building_use: text(self.building_use),
            approach: text(self.approach),
            sample_size: text(self.sample_size),
            ..Default::default()
        }
    }
}

/// What happened to one confirmed match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub record_id: i64,
    pub excel_study: String,
    /// `None` on success.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationReport {
    pub updated: Vec<i64>,
    pub failed: Vec<RecordOutcome>,
    /// Candidates skipped because their confidence is not importable.
    pub skipped: usize,
}

impl PropagationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Apply confirmed matches one record at a time. A failed record is reported
/// and the rest continue; earlier writes stay.
pub async fn propagate(
    store: &dyn RecordStore,
    table: &Table,
    title_column: &TitleColumn,
    confirmed: &[MatchCandidate],
    mut on_record: impl FnMut(&RecordOutcome) + Send,
) -> PropagationReport {
    let columns = ColumnMap::detect(&table.headers, title_column);
    let mut report = PropagationReport::default();

    for candidate in confirmed {
        if !candidate.confidence.is_importable() {
            report.skipped += 1;
            continue;
        }
        let row = (0..table.rows.len())
            .find(|r| table.cell(*r, title_column.index) == candidate.excel_study);

        let error = match row {
            None => Some(format!("No sheet row titled {:?}", candidate.excel_study)),
            Some(row) => {
                let patch = columns.patch_for_row(table, row);
                if patch.is_empty() {
                    None
                } else {
                    match store.update(candidate.db_record_id, &patch).await {
                        Ok(Some(_)) => None,
                        Ok(None) => Some("Record no longer exists".to_string()),
                        Err(e) => Some(e.to_string()),
                    }
                }
            }
        };

        let outcome = RecordOutcome {
            record_id: candidate.db_record_id,
            excel_study: candidate.excel_study.clone(),
            error,
        };
        on_record(&outcome);
        match &outcome.error {
            None => report.updated.push(outcome.record_id),
            Some(e) => {
                warn!(
                    "Metadata propagation failed for record {}: {}",
                    outcome.record_id, e
                );
                report.failed.push(outcome);
            }
        }
    }

    info!(
        "Propagated metadata to {} records ({} failed, {} skipped)",
        report.updated.len(),
        report.failed.len(),
        report.skipped
    );
    report
}
