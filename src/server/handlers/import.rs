//! Bulk import endpoints. Administrators only.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::super::actor::{require_admin, CurrentActor};
use super::super::error::ApiResult;
use super::super::AppState;
use crate::import::{ConfirmOutcome, ReviewPage, SelectionUpdate, UploadSummary};

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: Option<String>,
}

pub async fn upload_import(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<UploadSummary>)> {
    require_admin(&actor)?;
    let summary = state.imports.upload(&body, params.filename.as_deref())?;
    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn match_import(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(session): Path<Uuid>,
) -> ApiResult<Json<ReviewPage>> {
    require_admin(&actor)?;
    Ok(Json(
        state
            .imports
            .run_match(session, state.records.as_ref())
            .await?,
    ))
}

pub async fn select_import(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(session): Path<Uuid>,
    Json(update): Json<SelectionUpdate>,
) -> ApiResult<Json<ReviewPage>> {
    require_admin(&actor)?;
    Ok(Json(state.imports.update_selection(session, &update)?))
}

pub async fn confirm_import(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(session): Path<Uuid>,
) -> ApiResult<Json<ConfirmOutcome>> {
    require_admin(&actor)?;
    let outcome = state
        .imports
        .confirm(session, state.records.as_ref(), |outcome| {
            tracing::debug!("Propagated record {}", outcome.record_id);
        })
        .await?;
    Ok(Json(outcome))
}

pub async fn discard_import(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(session): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_admin(&actor)?;
    state.imports.discard(session)?;
    Ok(StatusCode::NO_CONTENT)
}
