//! Record submission, moderation and editing endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::super::actor::CurrentActor;
use super::super::error::ApiResult;
use super::super::AppState;
use crate::error::AppError;
use crate::models::{Record, RecordPatch, RecordStatus};
use crate::services::{Affirmed, Deleted, Submission};

pub async fn submit_record(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(submission): Json<Submission>,
) -> ApiResult<(StatusCode, Json<Affirmed<Record>>)> {
    let created = state.record_service.submit(&actor, submission).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn edit_record(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
    Json(patch): Json<RecordPatch>,
) -> ApiResult<Json<Affirmed<Record>>> {
    Ok(Json(state.record_service.edit(&actor, id, patch).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

pub async fn moderate_record(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
    Json(body): Json<StatusBody>,
) -> ApiResult<Json<Affirmed<Record>>> {
    let status = RecordStatus::from_str(&body.status).ok_or_else(|| {
        AppError::Validation(format!("Unknown status {:?}", body.status))
    })?;
    Ok(Json(
        state.record_service.moderate(&actor, id, status).await?,
    ))
}

pub async fn delete_record(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> ApiResult<Json<Affirmed<Deleted>>> {
    Ok(Json(state.record_service.delete(&actor, id).await?))
}

pub async fn my_records(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Json<Vec<Record>>> {
    Ok(Json(state.record_service.my_submissions(&actor).await?))
}
