//! Memoized vocabulary lists over any record store.
//!
//! `distinct` results are kept per (column, visibility) until the next write
//! through this handle. Writes from other processes are not observed.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::debug;

use super::store::{RecordColumn, RecordQuery, RecordStore, SubstringQuery};
use crate::error::StoreResult;
use crate::models::{NewRecord, Record, RecordPatch, Visibility};

type VocabularyKey = (RecordColumn, Visibility);

pub struct CachedRecordStore {
    inner: Arc<dyn RecordStore>,
    vocabulary: RwLock<HashMap<VocabularyKey, Vec<String>>>,
}

impl CachedRecordStore {
    pub fn new(inner: Arc<dyn RecordStore>) -> Self {
        Self {
            inner,
            vocabulary: RwLock::new(HashMap::new()),
        }
    }

    fn cached(&self, key: &VocabularyKey) -> Option<Vec<String>> {
        self.vocabulary
            .read()
            .ok()
            .and_then(|guard| guard.get(key).cloned())
    }

    fn remember(&self, key: VocabularyKey, values: Vec<String>) {
        if let Ok(mut guard) = self.vocabulary.write() {
            guard.insert(key, values);
        }
    }

    /// Drop every memoized list.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.vocabulary.write() {
            if !guard.is_empty() {
                debug!("Invalidating {} vocabulary lists", guard.len());
            }
            guard.clear();
        }
    }
}

#[async_trait]
impl RecordStore for CachedRecordStore {
    async fn fetch(&self, query: &RecordQuery) -> StoreResult<Vec<Record>> {
        self.inner.fetch(query).await
    }

    async fn get(&self, id: i64) -> StoreResult<Option<Record>> {
        self.inner.get(id).await
    }

    async fn search(&self, query: &SubstringQuery) -> StoreResult<Vec<Record>> {
        self.inner.search(query).await
    }

    async fn distinct(
        &self,
        column: RecordColumn,
        visibility: Visibility,
    ) -> StoreResult<Vec<String>> {
        let key = (column, visibility);
        if let Some(values) = self.cached(&key) {
            return Ok(values);
        }
        let values = self.inner.distinct(column, visibility).await?;
        self.remember(key, values.clone());
        Ok(values)
    }

    async fn max_id(&self) -> StoreResult<Option<i64>> {
        self.inner.max_id().await
    }

    async fn insert_with_id(&self, id: i64, record: &NewRecord) -> StoreResult<Record> {
        let result = self.inner.insert_with_id(id, record).await;
        self.invalidate();
        result
    }

    async fn update(&self, id: i64, patch: &RecordPatch) -> StoreResult<Option<Record>> {
        let result = self.inner.update(id, patch).await;
        self.invalidate();
        result
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = self.inner.delete(id).await;
        self.invalidate();
        result
    }

    async fn refresh_credentials(&self) -> StoreResult<bool> {
        self.inner.refresh_credentials().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryRecordStore;

    fn new_record(criteria: &str) -> NewRecord {
        NewRecord {
            criteria: criteria.to_string(),
            energy_method: "EUI".to_string(),
            direction: "Increase".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_vocabulary_invalidated_on_write() {
        let inner = MemoryRecordStore::new();
        inner.insert(&new_record("Density")).await.unwrap();
        let cached = CachedRecordStore::new(Arc::new(inner.clone()));

        let first = cached
            .distinct(RecordColumn::Criteria, Visibility::Approved)
            .await
            .unwrap();
        assert_eq!(first, vec!["Density".to_string()]);

        // A write that bypasses the cache is not observed.
        inner.insert(&new_record("Albedo")).await.unwrap();
        let stale = cached
            .distinct(RecordColumn::Criteria, Visibility::Approved)
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);

        cached.insert(&new_record("Compactness")).await.unwrap();
        let fresh = cached
            .distinct(RecordColumn::Criteria, Visibility::Approved)
            .await
            .unwrap();
        assert_eq!(fresh, vec!["Albedo", "Compactness", "Density"]);
    }
}
