//! The record store capability interface.
//!
//! Embedded (SQLite), remote (PostgreSQL) and in-memory stores all implement
//! [`RecordStore`], so the query engine, importer and analysis builder never
//! know which one they are talking to.

use async_trait::async_trait;
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::models::{NewRecord, Record, RecordPatch, Visibility};

/// Exact-match constraints pushed down to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    /// Compared after trimming.
    pub criteria: Option<String>,
    pub energy_method: Option<String>,
    pub direction: Option<String>,
    /// Only records submitted by this user.
    pub user: Option<String>,
    pub visibility: Visibility,
}

impl RecordQuery {
    pub fn visible() -> Self {
        Self::default()
    }

    pub fn with_criteria(mut self, criteria: &str) -> Self {
        self.criteria = Some(criteria.trim().to_string());
        self
    }

    /// Whether a record satisfies every constraint. Stores that cannot push a
    /// constraint down use this to finish the filtering.
    pub fn matches(&self, record: &Record) -> bool {
        self.visibility.admits(record.status)
            && self
                .criteria
                .as_deref()
                .map_or(true, |c| record.criteria.trim() == c.trim())
            && self
                .energy_method
                .as_deref()
                .map_or(true, |m| record.energy_method == m)
            && self
                .direction
                .as_deref()
                .map_or(true, |d| record.direction == d)
            && self
                .user
                .as_deref()
                .map_or(true, |u| record.user.as_deref() == Some(u))
    }
}

/// Which text columns a substring search looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Only `paragraph` (import matching).
    Paragraph,
    /// paragraph, criteria, energy_method, location, climate, building_use, approach.
    AllText,
}

/// Case-insensitive substring search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstringQuery {
    pub needle: String,
    pub scope: SearchScope,
    /// Also match this id exactly.
    pub id: Option<i64>,
    pub visibility: Visibility,
    pub limit: Option<i64>,
}

impl SubstringQuery {
    pub fn matches(&self, record: &Record) -> bool {
        if !self.visibility.admits(record.status) {
            return false;
        }
        if self.id == Some(record.id) {
            return true;
        }
        let needle = self.needle.to_lowercase();
        let contains = |s: Option<&str>| s.is_some_and(|v| v.to_lowercase().contains(&needle));
        match self.scope {
            SearchScope::Paragraph => contains(record.paragraph.as_deref()),
            SearchScope::AllText => {
                contains(record.paragraph.as_deref())
                    || contains(Some(&record.criteria))
                    || contains(Some(&record.energy_method))
                    || contains(record.location.as_deref())
                    || contains(record.climate.as_deref())
                    || contains(record.building_use.as_deref())
                    || contains(record.approach.as_deref())
            }
        }
    }
}

/// Columns that can be listed as a vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordColumn {
    Criteria,
    EnergyMethod,
    Direction,
    Scale,
    Climate,
    Location,
    BuildingUse,
    Approach,
}

impl RecordColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Criteria => "criteria",
            Self::EnergyMethod => "energy_method",
            Self::Direction => "direction",
            Self::Scale => "scale",
            Self::Climate => "climate",
            Self::Location => "location",
            Self::BuildingUse => "building_use",
            Self::Approach => "approach",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "criteria" => Some(Self::Criteria),
            "energy_method" => Some(Self::EnergyMethod),
            "direction" => Some(Self::Direction),
            "scale" => Some(Self::Scale),
            "climate" => Some(Self::Climate),
            "location" => Some(Self::Location),
            "building_use" => Some(Self::BuildingUse),
            "approach" => Some(Self::Approach),
            _ => None,
        }
    }

    pub fn value<'a>(&self, record: &'a Record) -> Option<&'a str> {
        match self {
            Self::Criteria => Some(&record.criteria),
            Self::EnergyMethod => Some(&record.energy_method),
            Self::Direction => Some(&record.direction),
            Self::Scale => record.scale.as_deref(),
            Self::Climate => record.climate.as_deref(),
            Self::Location => record.location.as_deref(),
            Self::BuildingUse => record.building_use.as_deref(),
            Self::Approach => record.approach.as_deref(),
        }
    }
}

/// Distinct non-empty values of a column across records, sorted.
pub fn distinct_values<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    column: RecordColumn,
) -> Vec<String> {
    tidy_values(records.into_iter().filter_map(|r| column.value(r)))
}

/// Trim, drop empties, sort and dedup.
pub fn tidy_values<S: AsRef<str>>(values: impl IntoIterator<Item = S>) -> Vec<String> {
    let mut values: Vec<String> = values
        .into_iter()
        .map(|v| v.as_ref().trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    values.sort();
    values.dedup();
    values
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records matching the query, ordered by id ascending.
    async fn fetch(&self, query: &RecordQuery) -> StoreResult<Vec<Record>>;

    /// Fetch one record regardless of visibility.
    async fn get(&self, id: i64) -> StoreResult<Option<Record>>;

    /// Substring search, ordered by id descending.
    async fn search(&self, query: &SubstringQuery) -> StoreResult<Vec<Record>>;

    /// Distinct non-empty values of a column, sorted.
    async fn distinct(&self, column: RecordColumn, visibility: Visibility)
        -> StoreResult<Vec<String>>;

    /// Largest id in the table, if any.
    async fn max_id(&self) -> StoreResult<Option<i64>>;

    /// Insert with an explicit id. Fails with `DuplicateKey` if it is taken.
    async fn insert_with_id(&self, id: i64, record: &NewRecord) -> StoreResult<Record>;

    /// Apply a patch; returns the updated record, or `None` if it does not exist.
    async fn update(&self, id: i64, patch: &RecordPatch) -> StoreResult<Option<Record>>;

    /// Delete a record; returns whether a row was removed.
    async fn delete(&self, id: i64) -> StoreResult<bool>;

    /// Refresh credentials after an expiry. Returns whether anything changed.
    async fn refresh_credentials(&self) -> StoreResult<bool> {
        Ok(false)
    }

    async fn next_id(&self) -> StoreResult<i64> {
        Ok(self.max_id().await?.unwrap_or(0) + 1)
    }

    /// Insert with `next_id = max(id) + 1`, retrying once on a duplicate key.
    async fn insert(&self, record: &NewRecord) -> StoreResult<Record> {
        let id = self.next_id().await?;
        match self.insert_with_id(id, record).await {
            Err(StoreError::DuplicateKey(msg)) => {
                warn!("Record id {} already taken ({}), retrying once", id, msg);
                let retry_id = self.next_id().await?.max(id + 1);
                self.insert_with_id(retry_id, record).await
            }
            other => other,
        }
    }
}

/// Run a store operation, retrying it once after a transient failure.
///
/// An expired credential is refreshed first and the body runs again only
/// when the refresh reports a change. An unavailable store is retried once
/// as is.
#[macro_export]
macro_rules! retry_transient {
    ($store:expr, $body:expr) => {{
        match $body {
            Err($crate::error::StoreError::CredentialExpired(msg)) => {
                tracing::warn!("Store credential expired ({}), refreshing", msg);
                if $store.refresh_credentials().await? {
                    $body
                } else {
                    Err($crate::error::StoreError::CredentialExpired(msg))
                }
            }
            Err($crate::error::StoreError::Unavailable(msg)) => {
                tracing::warn!("Store unavailable ({}), retrying once", msg);
                $body
            }
            other => other,
        }
    }};
}

#[allow(unused_imports)]
pub use retry_transient;
