//! listcraft-server: HTTP front end for listing template generation

pub mod error;
pub mod extract;
pub mod routes;

pub use error::ApiError;

use axum::Router;
use axum::routing::{get, post};
use listcraft_core::{ListcraftConfig, TemplateRewriter, TemplateStore};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared, read-only state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: TemplateStore,
    pub rewriter: Arc<TemplateRewriter>,
}

impl AppState {
    pub fn new(store: TemplateStore, rewriter: TemplateRewriter) -> Self {
        Self {
            store,
            rewriter: Arc::new(rewriter),
        }
    }

    pub fn from_config(config: &ListcraftConfig) -> Self {
        Self::new(
            TemplateStore::new(config.templates.clone()),
            TemplateRewriter::new(config.rewrite.clone()),
        )
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/create-upload-file", post(routes::create_upload_file))
        .route("/stok-guncelle", post(routes::stock_update))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
