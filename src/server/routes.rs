//! Router configuration for the web server.

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Faceted browsing
        .route("/api/query", post(handlers::query))
        .route("/api/search", get(handlers::search))
        .route("/api/vocabulary/:column", get(handlers::vocabulary))
        // Records
        .route("/api/records", post(handlers::submit_record))
        .route("/api/records/mine", get(handlers::my_records))
        .route(
            "/api/records/:id",
            put(handlers::edit_record).delete(handlers::delete_record),
        )
        .route("/api/records/:id/status", post(handlers::moderate_record))
        // Bulk import
        .route("/api/import", post(handlers::upload_import))
        .route("/api/import/:session", delete(handlers::discard_import))
        .route("/api/import/:session/match", post(handlers::match_import))
        .route(
            "/api/import/:session/selection",
            post(handlers::select_import),
        )
        .route("/api/import/:session/confirm", post(handlers::confirm_import))
        // Analyses
        .route("/api/analysis", post(handlers::build_analysis))
        .route(
            "/api/analyses",
            post(handlers::save_analysis).get(handlers::list_analyses),
        )
        .route("/api/analyses/:id/svg", get(handlers::export_analysis_svg))
        .route("/api/analyses/:id", delete(handlers::delete_analysis))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
