//! Diesel-backed record store for the embedded and remote modes.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::credentials::CredentialRefresher;
use super::diesel_models::{NewRecordRow, RecordChangeset, RecordRow};
use super::pool::DbPool;
use super::store::{
    tidy_values, RecordColumn, RecordQuery, RecordStore, SearchScope, SubstringQuery,
};
use super::util::escape_like;
use crate::error::StoreResult;
use crate::models::{NewRecord, Record, RecordPatch, Visibility};
use crate::schema::energy_data;
use crate::{retry_transient, with_conn};

diesel::define_sql_function! {
    fn lower(x: diesel::sql_types::Nullable<diesel::sql_types::Text>) -> diesel::sql_types::Nullable<diesel::sql_types::Text>;
}

diesel::define_sql_function! {
    fn trim(x: diesel::sql_types::Text) -> diesel::sql_types::Text;
}

/// Restrict a boxed `energy_data` query to the rows a visibility admits.
macro_rules! visible {
    ($query:expr, $visibility:expr) => {
        match $visibility {
            Visibility::Public => $query.filter(
                energy_data::status
                    .is_null()
                    .or(energy_data::status.ne("rejected")),
            ),
            Visibility::Approved => $query.filter(
                energy_data::status
                    .is_null()
                    .or(energy_data::status.ne_all(["rejected", "pending"])),
            ),
            Visibility::All => $query,
        }
    };
}

/// Distinct values of one column among the rows a visibility admits.
macro_rules! distinct_column {
    ($pool:expr, $column:expr, $visibility:expr) => {
        with_conn!($pool, conn => {
            let mut q = energy_data::table.select($column).distinct().into_boxed();
            q = visible!(q, $visibility);
            q.load::<Option<String>>(&mut conn).await
        })
    };
}

/// Record store over the `energy_data` table.
#[derive(Clone)]
pub struct DieselRecordStore {
    pool: DbPool,
    credentials: Option<CredentialRefresher>,
}

impl DieselRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, refresher: CredentialRefresher) -> Self {
        self.credentials = Some(refresher);
        self
    }

    async fn fetch_once(&self, query: &RecordQuery) -> StoreResult<Vec<Record>> {
        let criteria = query.criteria.as_deref().map(str::trim);
        let energy_method = query.energy_method.as_deref();
        let direction = query.direction.as_deref();
        let user = query.user.as_deref();
        let visibility = query.visibility;

        let rows: Vec<RecordRow> = with_conn!(self.pool, conn => {
            let mut q = energy_data::table
                .select(RecordRow::as_select())
                .into_boxed();
            q = visible!(q, visibility);
            if let Some(c) = criteria {
                q = q.filter(trim(energy_data::criteria).eq(c));
            }
            if let Some(m) = energy_method {
                q = q.filter(energy_data::energy_method.eq(m));
            }
            if let Some(d) = direction {
                q = q.filter(energy_data::direction.eq(d));
            }
            if let Some(u) = user {
                q = q.filter(energy_data::submitted_by.eq(u));
            }
            q.order(energy_data::id.asc()).load(&mut conn).await
        })?;

        Ok(rows.into_iter().map(Record::from).collect())
    }

    async fn search_once(&self, query: &SubstringQuery) -> StoreResult<Vec<Record>> {
        if self.pool.is_sqlite() {
            return self.search_folded(query).await;
        }
        let pattern = format!("%{}%", escape_like(&query.needle.to_lowercase()));
        let visibility = query.visibility;
        let scope = query.scope;
        let limit = query.limit;

        let mut rows: Vec<RecordRow> = with_conn!(self.pool, conn => {
            let mut q = energy_data::table
                .select(RecordRow::as_select())
                .into_boxed();
            q = visible!(q, visibility);
            let p = pattern.as_str();
            q = match scope {
                SearchScope::Paragraph => {
                    q.filter(lower(energy_data::paragraph).like(p).escape('\\'))
                }
                SearchScope::AllText => q.filter(
                    lower(energy_data::paragraph)
                        .like(p)
                        .escape('\\')
                        .or(lower(energy_data::criteria.nullable()).like(p).escape('\\'))
                        .or(lower(energy_data::energy_method.nullable()).like(p).escape('\\'))
                        .or(lower(energy_data::location).like(p).escape('\\'))
                        .or(lower(energy_data::climate).like(p).escape('\\'))
                        .or(lower(energy_data::building_use).like(p).escape('\\'))
                        .or(lower(energy_data::approach).like(p).escape('\\')),
                ),
            };
            q = q.order(energy_data::id.desc());
            if let Some(n) = limit {
                q = q.limit(n);
            }
            q.load(&mut conn).await
        })?;

        // An id hit joins the text hits, keeping id-descending order.
        if let Some(id) = query.id {
            if !rows.iter().any(|r| r.id == id) {
                let by_id: Option<RecordRow> = with_conn!(self.pool, conn => {
                    let mut q = energy_data::table
                        .select(RecordRow::as_select())
                        .into_boxed();
                    q = visible!(q, visibility);
                    q.filter(energy_data::id.eq(id))
                        .first(&mut conn)
                        .await
                        .optional()
                })?;
                if let Some(row) = by_id {
                    rows.push(row);
                    rows.sort_by(|a, b| b.id.cmp(&a.id));
                    if let Some(n) = limit {
                        rows.truncate(n.max(0) as usize);
                    }
                }
            }
        }

        Ok(rows.into_iter().map(Record::from).collect())
    }

    /// SQLite's `lower()` folds ASCII only, so text matching on the embedded
    /// store finishes in Rust over the visible rows.
    async fn search_folded(&self, query: &SubstringQuery) -> StoreResult<Vec<Record>> {
        let visibility = query.visibility;
        let rows: Vec<RecordRow> = with_conn!(self.pool, conn => {
            let mut q = energy_data::table
                .select(RecordRow::as_select())
                .into_boxed();
            q = visible!(q, visibility);
            q.order(energy_data::id.desc()).load(&mut conn).await
        })?;

        let hits = rows
            .into_iter()
            .map(Record::from)
            .filter(|r| query.matches(r));
        Ok(match query.limit {
            Some(n) => hits.take(n.max(0) as usize).collect(),
            None => hits.collect(),
        })
    }

    async fn distinct_once(
        &self,
        column: RecordColumn,
        visibility: Visibility,
    ) -> StoreResult<Vec<String>> {
        let values = match column {
            RecordColumn::Criteria => {
                distinct_column!(self.pool, energy_data::criteria.nullable(), visibility)
            }
            RecordColumn::EnergyMethod => {
                distinct_column!(self.pool, energy_data::energy_method.nullable(), visibility)
            }
            RecordColumn::Direction => {
                distinct_column!(self.pool, energy_data::direction.nullable(), visibility)
            }
            RecordColumn::Scale => distinct_column!(self.pool, energy_data::scale, visibility),
            RecordColumn::Climate => distinct_column!(self.pool, energy_data::climate, visibility),
            RecordColumn::Location => {
                distinct_column!(self.pool, energy_data::location, visibility)
            }
            RecordColumn::BuildingUse => {
                distinct_column!(self.pool, energy_data::building_use, visibility)
            }
            RecordColumn::Approach => {
                distinct_column!(self.pool, energy_data::approach, visibility)
            }
        }?;
        // Values differing only in surrounding whitespace collapse here.
        Ok(tidy_values(values.into_iter().flatten()))
    }

    async fn get_once(&self, id: i64) -> StoreResult<Option<Record>> {
        let row: Option<RecordRow> = with_conn!(self.pool, conn => {
            energy_data::table
                .find(id)
                .select(RecordRow::as_select())
                .first(&mut conn)
                .await
                .optional()
        })?;
        Ok(row.map(Record::from))
    }

    async fn max_id_once(&self) -> StoreResult<Option<i64>> {
        Ok(with_conn!(self.pool, conn => {
            energy_data::table
                .select(diesel::dsl::max(energy_data::id))
                .first::<Option<i64>>(&mut conn)
                .await
        })?)
    }

    async fn insert_once(&self, row: &NewRecordRow<'_>) -> StoreResult<usize> {
        Ok(with_conn!(self.pool, conn => {
            diesel::insert_into(energy_data::table)
                .values(row)
                .execute(&mut conn)
                .await
        })?)
    }

    async fn update_once(&self, id: i64, changes: &RecordChangeset<'_>) -> StoreResult<usize> {
        Ok(with_conn!(self.pool, conn => {
            diesel::update(energy_data::table.find(id))
                .set(changes)
                .execute(&mut conn)
                .await
        })?)
    }

    async fn delete_once(&self, id: i64) -> StoreResult<usize> {
        Ok(with_conn!(self.pool, conn => {
            diesel::delete(energy_data::table.find(id))
                .execute(&mut conn)
                .await
        })?)
    }
}

#[async_trait]
impl RecordStore for DieselRecordStore {
    async fn fetch(&self, query: &RecordQuery) -> StoreResult<Vec<Record>> {
        retry_transient!(self, self.fetch_once(query).await)
    }

    async fn get(&self, id: i64) -> StoreResult<Option<Record>> {
        retry_transient!(self, self.get_once(id).await)
    }

    async fn search(&self, query: &SubstringQuery) -> StoreResult<Vec<Record>> {
        retry_transient!(self, self.search_once(query).await)
    }

    async fn distinct(
        &self,
        column: RecordColumn,
        visibility: Visibility,
    ) -> StoreResult<Vec<String>> {
        retry_transient!(self, self.distinct_once(column, visibility).await)
    }

    async fn max_id(&self) -> StoreResult<Option<i64>> {
        retry_transient!(self, self.max_id_once().await)
    }

    async fn insert_with_id(&self, id: i64, record: &NewRecord) -> StoreResult<Record> {
        let created_at = chrono::Utc::now().to_rfc3339();
        let row = NewRecordRow::new(id, record, &created_at);
        retry_transient!(self, self.insert_once(&row).await)?;
        Ok(record.clone().into_record(id, created_at))
    }

    async fn update(&self, id: i64, patch: &RecordPatch) -> StoreResult<Option<Record>> {
        if patch.is_empty() {
            return self.get(id).await;
        }
        let changes = RecordChangeset::from(patch);
        let updated = retry_transient!(self, self.update_once(id, &changes).await)?;
        if updated == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let deleted = retry_transient!(self, self.delete_once(id).await)?;
        Ok(deleted > 0)
    }

    async fn refresh_credentials(&self) -> StoreResult<bool> {
        match &self.credentials {
            Some(refresher) => refresher.refresh(),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::RecordStatus;
    use crate::repository::migrations::run_migrations;
    use tempfile::tempdir;

    async fn setup() -> (DieselRecordStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("evidence.db");
        run_migrations(&path.display().to_string(), false)
            .await
            .unwrap();
        (DieselRecordStore::new(DbPool::sqlite_from_path(&path)), dir)
    }

    fn record(criteria: &str, paragraph: &str, status: Option<RecordStatus>) -> NewRecord {
        NewRecord {
            criteria: criteria.to_string(),
            energy_method: "EUI".to_string(),
            direction: "Increase".to_string(),
            paragraph: Some(paragraph.to_string()),
            status,
            climate: Some("Cfa".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_visible() {
        let (store, _dir) = setup().await;
        store
            .insert(&record("Density", "Smith et al. 2019", None))
            .await
            .unwrap();
        store
            .insert(&record("Density", "Jones 2020", Some(RecordStatus::Pending)))
            .await
            .unwrap();
        store
            .insert(&record("Density", "Lee 2021", Some(RecordStatus::Rejected)))
            .await
            .unwrap();

        let public = store
            .fetch(&RecordQuery::visible().with_criteria(" Density "))
            .await
            .unwrap();
        assert_eq!(public.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);

        let approved = store
            .fetch(&RecordQuery {
                visibility: Visibility::Approved,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(approved.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_maps_to_duplicate_key() {
        let (store, _dir) = setup().await;
        store
            .insert_with_id(117, &record("Density", "a", None))
            .await
            .unwrap();
        let err = store
            .insert_with_id(117, &record("Density", "b", None))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(_)));

        let next = store.insert(&record("Density", "c", None)).await.unwrap();
        assert_eq!(next.id, 118);
    }

    #[tokio::test]
    async fn test_search_escapes_wildcards_and_matches_id() {
        let (store, _dir) = setup().await;
        store
            .insert(&record("Glazing", "Ratio of 50% glazing", None))
            .await
            .unwrap();
        store
            .insert(&record("Glazing", "Ratio of 500 units", None))
            .await
            .unwrap();

        let hits = store
            .search(&SubstringQuery {
                needle: "50%".to_string(),
                scope: SearchScope::AllText,
                id: None,
                visibility: Visibility::Public,
                limit: Some(10),
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);

        let by_id = store
            .search(&SubstringQuery {
                needle: "2".to_string(),
                scope: SearchScope::AllText,
                id: Some(2),
                visibility: Visibility::Public,
                limit: Some(10),
            })
            .await
            .unwrap();
        assert_eq!(by_id.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2]);
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_case() {
        let (store, _dir) = setup().await;
        store
            .insert(&record("Density", "As ÖSTBERG 2018 showed for Malmö", None))
            .await
            .unwrap();
        store
            .insert(&record("Density", "Östberg 2018", Some(RecordStatus::Rejected)))
            .await
            .unwrap();

        let hits = store
            .search(&SubstringQuery {
                needle: "Östberg 2018".to_string(),
                scope: SearchScope::Paragraph,
                id: None,
                visibility: Visibility::Public,
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(hits.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1]);

        let everywhere = store
            .search(&SubstringQuery {
                needle: "MALMÖ".to_string(),
                scope: SearchScope::AllText,
                id: None,
                visibility: Visibility::Public,
                limit: Some(5),
            })
            .await
            .unwrap();
        assert_eq!(everywhere.len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (store, _dir) = setup().await;
        let r = store.insert(&record("Density", "p", None)).await.unwrap();

        let patch = RecordPatch {
            location: Some(Some("Paris, FR".to_string())),
            climate: Some(None),
            ..Default::default()
        };
        let updated = store.update(r.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.location.as_deref(), Some("Paris, FR"));
        assert_eq!(updated.climate, None);
        assert_eq!(updated.paragraph.as_deref(), Some("p"));

        assert!(store.update(999, &patch).await.unwrap().is_none());
        assert!(store.delete(r.id).await.unwrap());
        assert!(!store.delete(r.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_distinct_uses_approved_visibility() {
        let (store, _dir) = setup().await;
        store.insert(&record("Density", "p", None)).await.unwrap();
        store
            .insert(&record("Compactness", "p", Some(RecordStatus::Pending)))
            .await
            .unwrap();

        store
            .insert(&NewRecord {
                location: Some(" Paris ".to_string()),
                ..record("Density", "q", None)
            })
            .await
            .unwrap();
        store
            .insert(&NewRecord {
                location: Some("Paris".to_string()),
                ..record("Density", "r", Some(RecordStatus::Rejected))
            })
            .await
            .unwrap();

        let values = store
            .distinct(RecordColumn::Criteria, Visibility::Approved)
            .await
            .unwrap();
        assert_eq!(values, vec!["Density".to_string()]);

        let locations = store
            .distinct(RecordColumn::Location, Visibility::Public)
            .await
            .unwrap();
        assert_eq!(locations, vec!["Paris".to_string()]);
        assert_eq!(
            store
                .distinct(RecordColumn::Climate, Visibility::All)
                .await
                .unwrap(),
            vec!["Cfa".to_string()]
        );
    }
}
