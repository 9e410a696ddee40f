//! Picker vocabularies drawn from approved records.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{ClimateCode, Visibility};
use crate::repository::{RecordColumn, RecordStore};

#[derive(Clone)]
pub struct VocabularyService {
    store: Arc<dyn RecordStore>,
}

impl VocabularyService {
    /// Wrap the store in a `CachedRecordStore` to memoize the lists.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Distinct values of a column among approved records.
    ///
    /// Climate is restricted to the closed code list and reported by code.
    pub async fn vocabulary(&self, column: RecordColumn) -> AppResult<Vec<String>> {
        let values = self.store.distinct(column, Visibility::Approved).await?;
        if column != RecordColumn::Climate {
            return Ok(values);
        }
        let codes: BTreeSet<ClimateCode> = values
            .iter()
            .filter_map(|v| ClimateCode::from_str(v))
            .collect();
        Ok(codes.into_iter().map(|c| c.as_str().to_string()).collect())
    }

    /// Same as [`Self::vocabulary`], addressed by column name.
    pub async fn vocabulary_named(&self, column: &str) -> AppResult<Vec<String>> {
        let column = RecordColumn::from_str(column)
            .ok_or_else(|| AppError::Validation(format!("Unknown column {:?}", column)))?;
        self.vocabulary(column).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewRecord, RecordStatus};
    use crate::repository::{CachedRecordStore, MemoryRecordStore};

    fn record(criteria: &str, climate: &str, status: Option<RecordStatus>) -> NewRecord {
        NewRecord {
            criteria: criteria.to_string(),
            energy_method: "EUI".to_string(),
            direction: "Increase".to_string(),
            climate: Some(climate.to_string()),
            status,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_vocabulary_uses_approved_records() {
        let store = MemoryRecordStore::new();
        store.insert(&record("Density", "Cfa – Humid subtropical", None)).await.unwrap();
        store
            .insert(&record("Albedo", "Tropical", Some(RecordStatus::Approved)))
            .await
            .unwrap();
        store
            .insert(&record("Glazing", "Dfb", Some(RecordStatus::Pending)))
            .await
            .unwrap();
        let service = VocabularyService::new(Arc::new(CachedRecordStore::new(Arc::new(store))));

        assert_eq!(
            service.vocabulary(RecordColumn::Criteria).await.unwrap(),
            vec!["Albedo", "Density"]
        );
        assert_eq!(
            service.vocabulary(RecordColumn::Climate).await.unwrap(),
            vec!["Cfa"]
        );
        let err = service.vocabulary_named("paragraph").await.unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
