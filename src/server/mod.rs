//! JSON API over the evidence database.
//!
//! Reads are open to visitors; writes resolve the acting user from the
//! `X-Evidence-User` header set by the authentication proxy.

mod actor;
mod error;
mod handlers;
mod routes;

pub use actor::{CurrentActor, USER_HEADER};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::filter::FilterEngine;
use crate::import::ImportSessions;
use crate::repository::{CachedRecordStore, DieselDbContext, DieselUserRepository, RecordStore};
use crate::services::{AnalysisService, RecordService, VocabularyService};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<dyn RecordStore>,
    pub users: DieselUserRepository,
    pub filter: FilterEngine,
    pub record_service: RecordService,
    pub vocabulary: VocabularyService,
    pub analyses: AnalysisService,
    pub imports: Arc<ImportSessions>,
    pub search_limit: i64,
}

impl AppState {
    /// Wire every service to one context. Record reads go through the
    /// vocabulary memo.
    pub fn from_context(ctx: &DieselDbContext, search_limit: i64, page_size: usize) -> Self {
        let records: Arc<dyn RecordStore> =
            Arc::new(CachedRecordStore::new(Arc::new(ctx.records())));
        Self {
            users: ctx.users(),
            filter: FilterEngine::new(records.clone()),
            record_service: RecordService::new(records.clone()),
            vocabulary: VocabularyService::new(records.clone()),
            analyses: AnalysisService::new(records.clone(), ctx.analyses()),
            imports: Arc::new(ImportSessions::new(page_size)),
            search_limit,
            records,
        }
    }

    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let ctx = settings.create_db_context()?;
        ctx.init_schema().await?;
        let mut state = Self::from_context(
            &ctx,
            settings.search_limit,
            settings.import_page_size,
        );
        state.imports = Arc::new(
            ImportSessions::new(settings.import_page_size)
                .with_idle_timeout(settings.import_idle_timeout),
        );
        Ok(state)
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let state = AppState::new(settings).await?;
    let app = create_router(state);

    let addr: SocketAddr = bind.parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
