//! Record submission, moderation and editing.
//!
//! Every write checks the actor first and returns a short affirmation that
//! the surfaces show before refreshing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{
    Actor, ClimateCode, Direction, NewRecord, Record, RecordPatch, RecordStatus, Visibility,
};
use crate::repository::{RecordQuery, RecordStore};

/// A contributor's proposed record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub criteria: String,
    pub energy_method: String,
    pub direction: String,
    pub paragraph: String,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub scale: Option<String>,
    #[serde(default)]
    pub climate: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub building_use: Option<String>,
    #[serde(default)]
    pub approach: Option<String>,
    #[serde(default)]
    pub sample_size: Option<String>,
}

/// A write's result plus the message to show for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Affirmed<T> {
    pub message: String,
    #[serde(flatten)]
    pub value: T,
}

/// Id of a removed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    pub id: i64,
}

fn affirm<T>(value: T, message: impl Into<String>) -> Affirmed<T> {
    Affirmed {
        message: message.into(),
        value,
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Blank clears the climate; anything else must name a known code and is
/// stored in its canonical spelling.
fn climate_code(value: Option<String>) -> AppResult<Option<String>> {
    match blank_to_none(value) {
        None => Ok(None),
        Some(raw) => ClimateCode::from_str(&raw)
            .map(|code| Some(code.as_str().to_string()))
            .ok_or_else(|| AppError::Validation(format!("Unknown climate {:?}", raw))),
    }
}

fn required(name: &str, value: &mut Option<String>) -> AppResult<()> {
    if let Some(v) = value {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(format!("{} cannot be blank", name)));
        }
        *v = trimmed.to_string();
    }
    Ok(())
}

fn require_admin(actor: &Actor, action: &str) -> AppResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::Authorization(format!(
            "Only administrators can {}",
            action
        )))
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Record {} not found", id))
}

#[derive(Clone)]
pub struct RecordService {
    store: Arc<dyn RecordStore>,
}

impl RecordService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Queue a new record for moderation.
    pub async fn submit(
        &self,
        actor: &Actor,
        submission: Submission,
    ) -> AppResult<Affirmed<Record>> {
        let Some(username) = actor.username() else {
            return Err(AppError::Authorization(
                "Sign in to submit evidence".to_string(),
            ));
        };

        let mut missing = Vec::new();
        for (name, value) in [
            ("criteria", &submission.criteria),
            ("energy_method", &submission.energy_method),
            ("paragraph", &submission.paragraph),
        ] {
            if value.trim().is_empty() {
                missing.push(name);
            }
        }
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }
        let direction = Direction::from_str(&submission.direction).ok_or_else(|| {
            AppError::Validation(format!(
                "Direction must be Increase or Decrease, got {:?}",
                submission.direction
            ))
        })?;
        let climate = climate_code(submission.climate)?;

        let record = NewRecord {
            group_id: submission.group_id,
            criteria: submission.criteria.trim().to_string(),
            energy_method: submission.energy_method.trim().to_string(),
            direction: direction.as_str().to_string(),
            paragraph: Some(submission.paragraph.trim().to_string()),
            status: Some(RecordStatus::Pending),
            user: Some(username.to_string()),
            scale: blank_to_none(submission.scale),
            climate,
            location: blank_to_none(submission.location),
            building_use: blank_to_none(submission.building_use),
            approach: blank_to_none(submission.approach),
            sample_size: blank_to_none(submission.sample_size),
        };
        let created = self.store.insert(&record).await?;
        info!("Record {} submitted by {}", created.id, username);
        Ok(affirm(created, "Thank you! Your submission is pending review."))
    }

    /// Set a record's moderation status.
    pub async fn moderate(
        &self,
        actor: &Actor,
        id: i64,
        status: RecordStatus,
    ) -> AppResult<Affirmed<Record>> {
        require_admin(actor, "moderate records")?;
        let patch = RecordPatch {
            status: Some(Some(status)),
            ..Default::default()
        };
        let record = self.store.update(id, &patch).await?.ok_or_else(|| not_found(id))?;
        info!("Record {} marked {}", id, status.as_str());
        Ok(affirm(record, format!("Record {} {}", id, status.as_str())))
    }

    pub async fn edit(
        &self,
        actor: &Actor,
        id: i64,
        mut patch: RecordPatch,
    ) -> AppResult<Affirmed<Record>> {
        require_admin(actor, "edit records")?;
        if patch.is_empty() {
            return Err(AppError::Validation("Nothing to update".to_string()));
        }
        required("criteria", &mut patch.criteria)?;
        required("energy_method", &mut patch.energy_method)?;
        if let Some(climate) = patch.climate.take() {
            patch.climate = Some(climate_code(climate)?);
        }
        if let Some(direction) = &patch.direction {
            if Direction::from_str(direction).is_none() {
                return Err(AppError::Validation(format!(
                    "Direction must be Increase or Decrease, got {:?}",
                    direction
                )));
            }
        }
        let record = self.store.update(id, &patch).await?.ok_or_else(|| not_found(id))?;
        info!("Record {} edited", id);
        Ok(affirm(record, format!("Record {} updated", id)))
    }

    /// Admins delete anything; contributors only their own submissions.
    pub async fn delete(&self, actor: &Actor, id: i64) -> AppResult<Affirmed<Deleted>> {
        let record = self.store.get(id).await?.ok_or_else(|| not_found(id))?;
        let owns = actor.username().is_some() && record.user.as_deref() == actor.username();
        if !actor.is_admin() && !owns {
            return Err(AppError::Authorization(
                "You can only delete records you submitted".to_string(),
            ));
        }
        if !self.store.delete(id).await? {
            return Err(not_found(id));
        }
        info!("Record {} deleted", id);
        Ok(affirm(Deleted { id }, format!("Record {} deleted", id)))
    }

    /// Everything the actor submitted, whatever its status.
    pub async fn my_submissions(&self, actor: &Actor) -> AppResult<Vec<Record>> {
        let Some(username) = actor.username() else {
            return Err(AppError::Authorization(
                "Sign in to see your submissions".to_string(),
            ));
        };
        let query = RecordQuery {
            user: Some(username.to_string()),
            visibility: Visibility::All,
            ..Default::default()
        };
        Ok(self.store.fetch(&query).await?)
    }
}
