//! Free-text search across record text fields.

use std::sync::Arc;

use crate::error::AppResult;
use crate::models::{Record, Visibility};
use crate::repository::{RecordStore, SearchScope, SubstringQuery};

pub const DEFAULT_SEARCH_LIMIT: i64 = 100;

/// Commas count as spaces; surrounding whitespace is dropped.
pub fn normalize_query(raw: &str) -> String {
    raw.replace(',', " ").trim().to_string()
}

/// Search visible records by substring, or by id when the query is an integer.
///
/// An empty query returns nothing rather than everything.
pub async fn search(
    store: &Arc<dyn RecordStore>,
    raw: &str,
    limit: Option<i64>,
) -> AppResult<Vec<Record>> {
    let needle = normalize_query(raw);
    if needle.is_empty() {
        return Ok(Vec::new());
    }
    let query = SubstringQuery {
        id: needle.parse::<i64>().ok(),
        needle,
        scope: SearchScope::AllText,
        visibility: Visibility::Public,
        limit: Some(limit.unwrap_or(DEFAULT_SEARCH_LIMIT).max(1)),
    };
    Ok(store.search(&query).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn store() -> Arc<dyn RecordStore> {
        Arc::new(MemoryRecordStore::with_records(vec![
            record(7, "Sample of 42 buildings", None),
            record(42, "Office towers", None),
            record(50, "Another 42 case", Some(RecordStatus::Rejected)),
            record(60, "Smith, 2019 results", None),
        ]))
    }

    #[tokio::test]
    async fn test_integer_query_matches_id_and_text() {
        let hits = search(&store(), "42", None).await.unwrap();
        assert_eq!(hits.iter().map(|r| r.id).collect::<Vec<_>>(), vec![42, 7]);
    }

    #[tokio::test]
    async fn test_empty_query_returns_nothing() {
        assert!(search(&store(), "  , ", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commas_become_spaces_and_limit_applies() {
        let hits = search(&store(), "density", Some(2)).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(normalize_query(" Smith,2019 "), "Smith 2019");
    }
}
