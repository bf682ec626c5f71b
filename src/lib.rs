use axum::{
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::download::DownloadOrchestrator;
use crate::extractor::Extractor;

// --- Modules ---
pub mod analysis;
pub mod config;
pub mod download;
pub mod error;
pub mod extractor;
pub mod formats;
pub mod handlers;
pub mod models;
pub mod platform;

/// Shared by every request. Nothing in here is mutable.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<dyn Extractor>,
    pub downloads: DownloadOrchestrator,
}

impl AppState {
    pub fn new(extractor: Arc<dyn Extractor>, downloads_root: impl Into<PathBuf>) -> Self {
        Self {
            downloads: DownloadOrchestrator::new(downloads_root, extractor.clone()),
            extractor,
        }
    }
}

/// Builds the HTTP surface: the page and the two API routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/analyze", post(handlers::analyze_video))
        .route("/api/download", get(handlers::download_video))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .with_state(state)
}
