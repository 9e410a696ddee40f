//! Read-only endpoints open to visitors.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::super::error::ApiResult;
use super::super::AppState;
use crate::filter::{self, FacetedResult, FilterSet};
use crate::models::Record;

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn query(
    State(state): State<AppState>,
    Json(filter): Json<FilterSet>,
) -> ApiResult<Json<FacetedResult>> {
    Ok(Json(state.filter.query(&filter).await?))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<i64>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Record>>> {
    let limit = params.limit.unwrap_or(state.search_limit);
    Ok(Json(
        filter::search(&state.records, &params.q, Some(limit)).await?,
    ))
}

pub async fn vocabulary(
    State(state): State<AppState>,
    Path(column): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let values = state.vocabulary.vocabulary_named(&column).await?;
    Ok(Json(json!({ "column": column, "values": values })))
}
