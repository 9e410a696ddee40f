//! Match spreadsheet study titles against record paragraphs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::normalize::{normalize_title, TitleColumn};
use super::table::Table;
use crate::error::AppResult;
use crate::models::{Record, Visibility};
use crate::repository::{RecordStore, SearchScope, SubstringQuery};

/// How strongly a candidate matches.
///
/// Only `Exact` is produced and only `Exact` is importable; the other classes
/// exist so a review can report weaker candidates it refuses to import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchConfidence {
    #[serde(rename = "exact_match")]
    Exact,
    #[serde(rename = "strong_match")]
    Strong,
    #[serde(rename = "strong_90pct")]
    Strong90,
    #[serde(rename = "good_match")]
    Good,
    #[serde(rename = "partial_match")]
    Partial,
    #[serde(rename = "fuzzy_match")]
    Fuzzy,
}

impl MatchConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact_match",
            Self::Strong => "strong_match",
            Self::Strong90 => "strong_90pct",
            Self::Good => "good_match",
            Self::Partial => "partial_match",
            Self::Fuzzy => "fuzzy_match",
        }
    }

    pub fn is_importable(&self) -> bool {
        matches!(self, Self::Exact)
    }
}

/// One record whose paragraph contains a spreadsheet title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// Title cell exactly as it appears in the sheet.
    pub excel_study: String,
    pub excel_study_normalized: String,
    pub db_record_id: i64,
    pub matching_paragraph: String,
    pub criteria: String,
    pub energy_method: String,
    pub direction: String,
    pub scale: Option<String>,
    pub climate: Option<String>,
    pub location: Option<String>,
    pub confidence: MatchConfidence,
    /// Character offset of the title inside the paragraph.
    pub match_position: usize,
    pub match_percentage: u8,
    /// The paragraph text that matched, in its original case.
    pub matching_text: String,
}

/// A sheet row no record matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedRow {
    pub excel_study: String,
    pub excel_study_normalized: String,
    pub reason: String,
}

/// Everything the administrator reviews before confirming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub title_column: String,
    pub title_column_detected: bool,
    pub matches: Vec<MatchCandidate>,
    pub unmatched: Vec<UnmatchedRow>,
}

impl MatchReport {
    pub fn importable(&self) -> impl Iterator<Item = (usize, &MatchCandidate)> {
        self.matches
            .iter()
            .enumerate()
            .filter(|(_, m)| m.confidence.is_importable())
    }

    /// Candidates found but refused for import.
    pub fn non_importable_count(&self) -> usize {
        self.matches
            .iter()
            .filter(|m| !m.confidence.is_importable())
            .count()
    }
}

/// Locate `needle` in `paragraph` case-insensitively.
///
/// Returns the character offset and the matched text in original case.
fn locate(paragraph: &str, needle: &str) -> Option<(usize, String)> {
    let needle_lower = needle.to_lowercase();
    let needle_chars = needle_lower.chars().count();
    let chars: Vec<char> = paragraph.chars().collect();
    (0..chars.len()).find_map(|start| {
        let end = (start + needle_chars).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        (window.to_lowercase() == needle_lower).then_some((start, window))
    })
}

fn candidate(title: &str, normalized: &str, record: &Record) -> MatchCandidate {
    let paragraph = record.paragraph.clone().unwrap_or_default();
    let (match_position, matching_text) =
        locate(&paragraph, normalized).unwrap_or((0, normalized.to_string()));
    MatchCandidate {
        excel_study: title.to_string(),
        excel_study_normalized: normalized.to_string(),
        db_record_id: record.id,
        matching_paragraph: paragraph,
        criteria: record.criteria.clone(),
        energy_method: record.energy_method.clone(),
        direction: record.direction.clone(),
        scale: record.scale.clone(),
        climate: record.climate.clone(),
        location: record.location.clone(),
        confidence: MatchConfidence::Exact,
        match_position,
        match_percentage: 100,
        matching_text,
    }
}

/// Match every unique title in the sheet against visible record paragraphs.
pub async fn match_table(
    store: &dyn RecordStore,
    table: &Table,
    title_column: &TitleColumn,
) -> AppResult<MatchReport> {
    let mut seen = HashSet::new();
    let mut matches = Vec::new();
    let mut unmatched = Vec::new();

    for row in 0..table.rows.len() {
        let title = table.cell(row, title_column.index);
        let normalized = normalize_title(title);
        if normalized.is_empty() {
            unmatched.push(UnmatchedRow {
                excel_study: title.to_string(),
                excel_study_normalized: normalized,
                reason: format!("Row {} has an empty title", row + 2),
            });
            continue;
        }
        if !seen.insert(normalized.clone()) {
            continue;
        }

        let mut hits = store
            .search(&SubstringQuery {
                needle: normalized.clone(),
                scope: SearchScope::Paragraph,
                id: None,
                visibility: Visibility::Public,
                limit: None,
            })
            .await?;
        hits.sort_by_key(|r| r.id);
        debug!("Title {:?} matched {} records", normalized, hits.len());

        if hits.is_empty() {
            unmatched.push(UnmatchedRow {
                excel_study: title.to_string(),
                excel_study_normalized: normalized,
                reason: "No record paragraph contains this title".to_string(),
            });
            continue;
        }
        matches.extend(hits.iter().map(|r| candidate(title, &normalized, r)));
    }

    info!(
        "Import matching: {} candidates, {} unmatched titles",
        matches.len(),
        unmatched.len()
    );
    Ok(MatchReport {
        title_column: title_column.header.clone(),
        title_column_detected: title_column.detected,
        matches,
        unmatched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::normalize::detect_title_column;
    use crate::models::{NewRecord, RecordStatus};
    use crate::repository::MemoryRecordStore;

    fn record(id: i64, paragraph: &str, status: Option<RecordStatus>) -> Record {
        NewRecord {
            criteria: "Density".to_string(),
            energy_method: "EUI".to_string(),
            direction: "Increase".to_string(),
            paragraph: Some(paragraph.to_string()),
            status,
            ..Default::default()
        }
        .into_record(id, String::new())
    }

    #[tokio::test]
    async fn test_match_table() {
        let store = MemoryRecordStore::with_records(vec![
            record(10, "As shown by SMITH ET AL. 2019, density matters.", None),
            record(11, "Smith et al. 2019 again", Some(RecordStatus::Rejected)),
            record(12, "Unrelated", None),
        ]);
        let table = Table::new(
            vec!["Study".to_string(), "Location".to_string()],
            vec![
                vec!["Smith  et al. 2019".to_string(), "Paris, FR".to_string()],
                vec!["smith et al. 2019".to_string(), "Lyon".to_string()],
                vec!["Nobody 1999".to_string(), "Rome".to_string()],
            ],
        );
        let column = detect_title_column(&table.headers).unwrap();
        let report = match_table(&store, &table, &column).await.unwrap();

        // Titles differing only in case are distinct; both hit record 10.
        assert_eq!(report.matches.len(), 2);
        let m = &report.matches[0];
        assert_eq!(m.db_record_id, 10);
        assert_eq!(m.excel_study, "Smith  et al. 2019");
        assert_eq!(m.excel_study_normalized, "Smith et al. 2019");
        assert_eq!(m.matching_text, "SMITH ET AL. 2019");
        assert_eq!(m.match_position, 12);
        assert_eq!(m.confidence.as_str(), "exact_match");
        assert_eq!(report.matches[1].db_record_id, 10);
        assert_eq!(report.matches[1].excel_study, "smith et al. 2019");

        assert_eq!(report.unmatched.len(), 1);
        assert_eq!(report.unmatched[0].excel_study, "Nobody 1999");
        assert_eq!(report.non_importable_count(), 0);
    }

    #[test]
    fn test_only_exact_is_importable() {
        assert!(MatchConfidence::Exact.is_importable());
        for weaker in [
            MatchConfidence::Strong,
            MatchConfidence::Strong90,
            MatchConfidence::Good,
            MatchConfidence::Partial,
            MatchConfidence::Fuzzy,
        ] {
            assert!(!weaker.is_importable());
        }
    }
}
