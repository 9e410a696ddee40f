//! In-memory record store.
//!
//! Backs engine tests and demos. Also supports injecting a duplicate-key
//! failure, an expired credential or an unreachable store so retry paths can
//! be exercised without a remote database.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::store::{distinct_values, RecordColumn, RecordQuery, RecordStore, SubstringQuery};
use crate::error::{StoreError, StoreResult};
use crate::models::{NewRecord, Record, RecordPatch, Visibility};
use crate::retry_transient;

#[derive(Default)]
struct Faults {
    duplicate_inserts: AtomicUsize,
    credential_expired: AtomicBool,
    refresh_fixes: AtomicBool,
    refreshes: AtomicUsize,
    unavailable_reads: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<RwLock<BTreeMap<i64, Record>>>,
    faults: Arc<Faults>,
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding exactly these records.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.records.write() {
            for record in records {
                map.insert(record.id, record);
            }
        }
        store
    }

    /// Make the next `count` explicit-id inserts fail with a duplicate key.
    pub fn fail_next_inserts_with_duplicate(&self, count: usize) {
        self.faults.duplicate_inserts.store(count, Ordering::SeqCst);
    }

    /// Make reads fail as if the credential expired until a refresh succeeds.
    pub fn expire_credentials(&self, refresh_fixes: bool) {
        self.faults.credential_expired.store(true, Ordering::SeqCst);
        self.faults
            .refresh_fixes
            .store(refresh_fixes, Ordering::SeqCst);
    }

    /// Make the next `count` reads fail as if the network dropped.
    pub fn fail_next_reads_unavailable(&self, count: usize) {
        self.faults.unavailable_reads.store(count, Ordering::SeqCst);
    }

    pub fn refresh_count(&self) -> usize {
        self.faults.refreshes.load(Ordering::SeqCst)
    }

    fn check_faults(&self) -> StoreResult<()> {
        if self.faults.credential_expired.load(Ordering::SeqCst) {
            return Err(StoreError::CredentialExpired("JWT expired".to_string()));
        }
        let dropped = self
            .faults
            .unavailable_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if dropped {
            return Err(StoreError::Unavailable(
                "error connecting to server: Connection refused".to_string(),
            ));
        }
        Ok(())
    }

    fn fetch_once(&self, query: &RecordQuery) -> StoreResult<Vec<Record>> {
        self.check_faults()?;
        let map = self.records.read().map_err(|_| poisoned())?;
        Ok(map.values().filter(|r| query.matches(r)).cloned().collect())
    }

    fn search_once(&self, query: &SubstringQuery) -> StoreResult<Vec<Record>> {
        self.check_faults()?;
        let map = self.records.read().map_err(|_| poisoned())?;
        let hits = map.values().rev().filter(|r| query.matches(r)).cloned();
        Ok(match query.limit {
            Some(limit) => hits.take(limit.max(0) as usize).collect(),
            None => hits.collect(),
        })
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn fetch(&self, query: &RecordQuery) -> StoreResult<Vec<Record>> {
        retry_transient!(self, self.fetch_once(query))
    }

    async fn get(&self, id: i64) -> StoreResult<Option<Record>> {
        let map = self.records.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn search(&self, query: &SubstringQuery) -> StoreResult<Vec<Record>> {
        retry_transient!(self, self.search_once(query))
    }

    async fn distinct(
        &self,
        column: RecordColumn,
        visibility: Visibility,
    ) -> StoreResult<Vec<String>> {
        let query = RecordQuery {
            visibility,
            ..Default::default()
        };
        let records = self.fetch(&query).await?;
        Ok(distinct_values(&records, column))
    }

    async fn max_id(&self) -> StoreResult<Option<i64>> {
        let map = self.records.read().map_err(|_| poisoned())?;
        Ok(map.keys().next_back().copied())
    }

    async fn insert_with_id(&self, id: i64, record: &NewRecord) -> StoreResult<Record> {
        let injected = self
            .faults
            .duplicate_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::DuplicateKey(format!(
                "UNIQUE constraint failed: energy_data.id ({})",
                id
            )));
        }

        let mut map = self.records.write().map_err(|_| poisoned())?;
        if map.contains_key(&id) {
            return Err(StoreError::DuplicateKey(format!(
                "UNIQUE constraint failed: energy_data.id ({})",
                id
            )));
        }
        let created = record
            .clone()
            .into_record(id, chrono::Utc::now().to_rfc3339());
        map.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, patch: &RecordPatch) -> StoreResult<Option<Record>> {
        let mut map = self.records.write().map_err(|_| poisoned())?;
        Ok(map.get_mut(&id).map(|record| {
            patch.apply(record);
            record.clone()
        }))
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let mut map = self.records.write().map_err(|_| poisoned())?;
        Ok(map.remove(&id).is_some())
    }

    async fn refresh_credentials(&self) -> StoreResult<bool> {
        self.faults.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.faults.refresh_fixes.load(Ordering::SeqCst) {
            self.faults.credential_expired.store(false, Ordering::SeqCst);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordStatus;
    use crate::repository::store::SearchScope;

    fn new_record(criteria: &str) -> NewRecord {
        NewRecord {
            criteria: criteria.to_string(),
            energy_method: "EUI".to_string(),
            direction: "Increase".to_string(),
            paragraph: Some(format!("{} study", criteria)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_next_id() {
        let store = MemoryRecordStore::new();
        store.insert_with_id(117, &new_record("Density")).await.unwrap();

        let inserted = store.insert(&new_record("Compactness")).await.unwrap();
        assert_eq!(inserted.id, 118);
    }

    #[tokio::test]
    async fn test_insert_retries_once_after_duplicate() {
        let store = MemoryRecordStore::new();
        store.insert_with_id(117, &new_record("Density")).await.unwrap();
        store.fail_next_inserts_with_duplicate(1);

        let inserted = store.insert(&new_record("Compactness")).await.unwrap();
        assert_eq!(inserted.id, 119);
    }

    #[tokio::test]
    async fn test_insert_gives_up_after_second_duplicate() {
        let store = MemoryRecordStore::new();
        store.fail_next_inserts_with_duplicate(2);

        let err = store.insert(&new_record("Density")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn test_expired_credential_refreshes_and_retries() {
        let store = MemoryRecordStore::new();
        store.insert(&new_record("Density")).await.unwrap();
        store.expire_credentials(true);

        let rows = store.fetch(&RecordQuery::visible()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(store.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_surfaces_error() {
        let store = MemoryRecordStore::new();
        store.expire_credentials(false);

        let err = store.fetch(&RecordQuery::visible()).await.unwrap_err();
        assert!(matches!(err, StoreError::CredentialExpired(_)));
        assert_eq!(store.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_retries_once() {
        let store = MemoryRecordStore::new();
        store.insert(&new_record("Density")).await.unwrap();
        store.fail_next_reads_unavailable(1);

        let rows = store.fetch(&RecordQuery::visible()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(store.refresh_count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_twice_surfaces_transient() {
        let store = MemoryRecordStore::new();
        store.fail_next_reads_unavailable(2);

        let err = store.fetch(&RecordQuery::visible()).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(crate::error::AppError::from(err).kind(), "transient");

        // The fault is spent; the next read goes through.
        assert!(store.fetch(&RecordQuery::visible()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_orders_by_id_desc_and_hides_rejected() {
        let store = MemoryRecordStore::new();
        for name in ["alpha", "alpha beta", "alpha gamma"] {
            store.insert(&new_record(name)).await.unwrap();
        }
        store
            .update(
                2,
                &RecordPatch {
                    status: Some(Some(RecordStatus::Rejected)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let hits = store
            .search(&SubstringQuery {
                needle: "ALPHA".to_string(),
                scope: SearchScope::AllText,
                id: None,
                visibility: Visibility::Public,
                limit: Some(10),
            })
            .await
            .unwrap();
        let ids: Vec<i64> = hits.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }
}
