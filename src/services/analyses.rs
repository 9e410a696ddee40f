//! Building, saving and exporting moderator analyses.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::{
    parse_legacy_html, render_html, render_svg, svg_data_uri, AnalysisBuilder, AnalysisRequest,
};
use crate::error::{AppError, AppResult};
use crate::models::{Actor, AnalysisModel, NewSavedAnalysis, SavedAnalysis};
use crate::repository::{DieselAnalysisRepository, RecordStore};

/// A rendered analysis, ready to display or save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedAnalysis {
    pub model: AnalysisModel,
    pub html: String,
    pub svg: String,
    pub svg_data_uri: String,
}

impl RenderedAnalysis {
    pub fn render(model: AnalysisModel) -> Self {
        let html = render_html(&model);
        let svg = render_svg(&model);
        let svg_data_uri = svg_data_uri(&svg);
        Self {
            model,
            html,
            svg,
            svg_data_uri,
        }
    }
}

fn require_user(actor: &Actor) -> AppResult<i64> {
    actor
        .user_id()
        .ok_or_else(|| AppError::Authorization("Sign in to save analyses".to_string()))
}

#[derive(Clone)]
pub struct AnalysisService {
    builder: AnalysisBuilder,
    saved: DieselAnalysisRepository,
}

impl AnalysisService {
    pub fn new(store: Arc<dyn RecordStore>, saved: DieselAnalysisRepository) -> Self {
        Self {
            builder: AnalysisBuilder::new(store),
            saved,
        }
    }

    pub async fn build(&self, request: &AnalysisRequest) -> AppResult<RenderedAnalysis> {
        let model = self.builder.build(request).await?;
        Ok(RenderedAnalysis::render(model))
    }

    /// Build and persist an analysis for the acting user.
    pub async fn save(&self, actor: &Actor, request: &AnalysisRequest) -> AppResult<SavedAnalysis> {
        let user_id = require_user(actor)?;
        let rendered = self.build(request).await?;
        let saved = self
            .saved
            .insert(&NewSavedAnalysis {
                user_id,
                model: rendered.model,
                html: rendered.html,
            })
            .await?;
        info!("Saved analysis {} for user {}", saved.id, user_id);
        Ok(saved)
    }

    pub async fn list(&self, actor: &Actor) -> AppResult<Vec<SavedAnalysis>> {
        let user_id = require_user(actor)?;
        Ok(self.saved.list_for_user(user_id).await?)
    }

    /// SVG for a saved analysis.
    ///
    /// Uses the stored tallies when present; older rows fall back to the
    /// cached HTML.
    pub async fn export_svg(&self, actor: &Actor, id: i64) -> AppResult<String> {
        let saved = self.owned(actor, id).await?;
        Ok(render_svg(&saved_model(&saved)?))
    }

    pub async fn delete(&self, actor: &Actor, id: i64) -> AppResult<String> {
        let user_id = require_user(actor)?;
        if !self.saved.delete_owned(id, user_id).await? {
            return Err(AppError::NotFound(format!("No saved analysis {}", id)));
        }
        info!("Deleted saved analysis {}", id);
        Ok(format!("Analysis {} deleted", id))
    }

    async fn owned(&self, actor: &Actor, id: i64) -> AppResult<SavedAnalysis> {
        let user_id = require_user(actor)?;
        match self.saved.get(id).await? {
            Some(saved) if saved.user_id == user_id || actor.is_admin() => Ok(saved),
            _ => Err(AppError::NotFound(format!("No saved analysis {}", id))),
        }
    }
}

/// The chart model of a saved row, recovering legacy rows from their HTML.
pub fn saved_model(saved: &SavedAnalysis) -> AppResult<AnalysisModel> {
    if let Some(model) = saved.model() {
        return Ok(model);
    }
    warn!(
        "Saved analysis {} has no stored tallies, parsing cached HTML",
        saved.id
    );
    saved
        .html
        .as_deref()
        .and_then(|html| parse_legacy_html(html, &saved.analysis_type, &saved.determinant))
        .ok_or_else(|| {
            AppError::InputFormat(format!(
                "Saved analysis {} cannot be exported: no chart data",
                saved.id
            ))
        })
}
