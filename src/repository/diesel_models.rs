//! Diesel row types for the evidence tables.
//!
//! Rows convert into the domain models in `crate::models`; status and role
//! strings are parsed at this boundary.

use diesel::prelude::*;

use crate::models::{NewRecord, Record, RecordPatch, RecordStatus, Role, SavedAnalysis, User};
use crate::schema;

/// Evidence row from `energy_data`.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::energy_data)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RecordRow {
    pub id: i64,
    pub group_id: Option<i64>,
    pub criteria: String,
    pub energy_method: String,
    pub direction: String,
    pub paragraph: Option<String>,
    pub status: Option<String>,
    pub submitted_by: Option<String>,
    pub scale: Option<String>,
    pub climate: Option<String>,
    pub location: Option<String>,
    pub building_use: Option<String>,
    pub approach: Option<String>,
    pub sample_size: Option<String>,
    pub created_at: Option<String>,
}

impl From<RecordRow> for Record {
    fn from(row: RecordRow) -> Self {
        Record {
            id: row.id,
            group_id: row.group_id,
            criteria: row.criteria,
            energy_method: row.energy_method,
            direction: row.direction,
            paragraph: row.paragraph,
            // Unknown status strings behave like an unmoderated seed row.
            status: row.status.as_deref().and_then(RecordStatus::from_str),
            user: row.submitted_by,
            scale: row.scale,
            climate: row.climate,
            location: row.location,
            building_use: row.building_use,
            approach: row.approach,
            sample_size: row.sample_size,
            created_at: row.created_at,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::energy_data)]
pub struct NewRecordRow<'a> {
    pub id: i64,
    pub group_id: Option<i64>,
    pub criteria: &'a str,
    pub energy_method: &'a str,
    pub direction: &'a str,
    pub paragraph: Option<&'a str>,
    pub status: Option<&'a str>,
    pub submitted_by: Option<&'a str>,
    pub scale: Option<&'a str>,
    pub climate: Option<&'a str>,
    pub location: Option<&'a str>,
    pub building_use: Option<&'a str>,
    pub approach: Option<&'a str>,
    pub sample_size: Option<&'a str>,
    pub created_at: Option<&'a str>,
}

impl<'a> NewRecordRow<'a> {
    pub fn new(id: i64, record: &'a NewRecord, created_at: &'a str) -> Self {
        Self {
            id,
            group_id: record.group_id,
            criteria: &record.criteria,
            energy_method: &record.energy_method,
            direction: &record.direction,
            paragraph: record.paragraph.as_deref(),
            status: record.status.map(|s| s.as_str()),
            submitted_by: record.user.as_deref(),
            scale: record.scale.as_deref(),
            climate: record.climate.as_deref(),
            location: record.location.as_deref(),
            building_use: record.building_use.as_deref(),
            approach: record.approach.as_deref(),
            sample_size: record.sample_size.as_deref(),
            created_at: Some(created_at),
        }
    }
}

/// Partial update. `None` skips a column; `Some(None)` writes NULL.
#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = schema::energy_data)]
pub struct RecordChangeset<'a> {
    pub criteria: Option<&'a str>,
    pub energy_method: Option<&'a str>,
    pub direction: Option<&'a str>,
    pub paragraph: Option<Option<&'a str>>,
    pub status: Option<Option<&'a str>>,
    pub scale: Option<Option<&'a str>>,
    pub climate: Option<Option<&'a str>>,
    pub location: Option<Option<&'a str>>,
    pub building_use: Option<Option<&'a str>>,
    pub approach: Option<Option<&'a str>>,
    pub sample_size: Option<Option<&'a str>>,
}

fn nested(value: &Option<Option<String>>) -> Option<Option<&str>> {
    value.as_ref().map(|v| v.as_deref())
}

impl<'a> From<&'a RecordPatch> for RecordChangeset<'a> {
    fn from(patch: &'a RecordPatch) -> Self {
        Self {
            criteria: patch.criteria.as_deref(),
            energy_method: patch.energy_method.as_deref(),
            direction: patch.direction.as_deref(),
            paragraph: nested(&patch.paragraph),
            status: patch.status.map(|s| s.map(|s| s.as_str())),
            scale: nested(&patch.scale),
            climate: nested(&patch.climate),
            location: nested(&patch.location),
            building_use: nested(&patch.building_use),
            approach: nested(&patch.approach),
            sample_size: nested(&patch.sample_size),
        }
    }
}

/// Account row from `users`. The password column is never read.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    pub email_confirmed: bool,
    pub auth_id: Option<String>,
    pub created_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            role: Role::from_str(&row.role).unwrap_or(Role::User),
            email_confirmed: row.email_confirmed,
            auth_id: row.auth_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::users)]
pub struct NewUserRow<'a> {
    pub username: &'a str,
    pub email: Option<&'a str>,
    pub role: &'a str,
    pub email_confirmed: bool,
    pub auth_id: Option<&'a str>,
    pub created_at: &'a str,
}

/// Saved analysis row. The sorted tallies are JSON text.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::user_saved_analyses)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SavedAnalysisRow {
    pub id: i64,
    pub user_id: i64,
    pub analysis_type: String,
    pub determinant: String,
    pub top_energy: Option<String>,
    pub bottom_energy: Option<String>,
    pub top_sorted: Option<String>,
    pub bottom_sorted: Option<String>,
    pub top_height: Option<i64>,
    pub bottom_height: Option<i64>,
    pub html: Option<String>,
    pub created_at: String,
}

impl SavedAnalysisRow {
    /// Convert to the domain model. Unparseable tallies are treated as missing
    /// so the row falls back to its cached HTML.
    pub fn into_saved(self) -> SavedAnalysis {
        let id = self.id;
        let parse = |raw: Option<String>| {
            raw.and_then(|json| match serde_json::from_str(&json) {
                Ok(tally) => Some(tally),
                Err(e) => {
                    tracing::warn!("Saved analysis {} has unreadable tallies: {}", id, e);
                    None
                }
            })
        };
        SavedAnalysis {
            id: self.id,
            user_id: self.user_id,
            analysis_type: self.analysis_type,
            determinant: self.determinant,
            top_energy: self.top_energy,
            bottom_energy: self.bottom_energy,
            top_sorted: parse(self.top_sorted),
            bottom_sorted: parse(self.bottom_sorted),
            top_height: self.top_height,
            bottom_height: self.bottom_height,
            html: self.html,
            created_at: self.created_at,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::user_saved_analyses)]
pub struct NewSavedAnalysisRow<'a> {
    pub user_id: i64,
    pub analysis_type: &'a str,
    pub determinant: &'a str,
    pub top_energy: Option<&'a str>,
    pub bottom_energy: Option<&'a str>,
    pub top_sorted: Option<String>,
    pub bottom_sorted: Option<String>,
    pub top_height: Option<i64>,
    pub bottom_height: Option<i64>,
    pub html: Option<&'a str>,
    pub created_at: &'a str,
}
