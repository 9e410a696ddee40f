//! Analysis building, saving and export endpoints.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use super::super::actor::CurrentActor;
use super::super::error::ApiResult;
use super::super::AppState;
use crate::analysis::AnalysisRequest;
use crate::models::SavedAnalysis;
use crate::services::RenderedAnalysis;

pub async fn build_analysis(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> ApiResult<Json<RenderedAnalysis>> {
    Ok(Json(state.analyses.build(&request).await?))
}

pub async fn save_analysis(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<AnalysisRequest>,
) -> ApiResult<(StatusCode, Json<SavedAnalysis>)> {
    let saved = state.analyses.save(&actor, &request).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn list_analyses(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Json<Vec<SavedAnalysis>>> {
    Ok(Json(state.analyses.list(&actor).await?))
}

pub async fn export_analysis_svg(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let svg = state.analyses.export_svg(&actor, id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"analysis-{}.svg\"", id),
            ),
        ],
        svg,
    ))
}

pub async fn delete_analysis(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let message = state.analyses.delete(&actor, id).await?;
    Ok(Json(json!({ "id": id, "message": message })))
}
