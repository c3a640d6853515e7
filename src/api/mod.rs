use axum::{Router, routing::get};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::searcher::DirectoryKeywordSearcher;

pub mod handlers;
pub mod models;

/// Everything a request needs, resolved once at startup and passed in explicitly.
#[derive(Debug, Clone)]
pub struct AppState {
    pub searcher: DirectoryKeywordSearcher,
    pub directory: PathBuf,
    pub search_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(directory: impl Into<PathBuf>) -> AppState {
        AppState {
            searcher: DirectoryKeywordSearcher::new(),
            directory: directory.into(),
            search_timeout: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> AppState {
        let options = &config.file_search_options;
        AppState {
            searcher: DirectoryKeywordSearcher::new()
                .with_max_concurrent_probes(options.max_concurrent_probes),
            directory: options.examples_directory_path.clone(),
            search_timeout: options.search_timeout(),
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/files/search", get(handlers::search_files_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
