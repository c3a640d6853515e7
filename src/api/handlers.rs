use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::SearchError;
use crate::searcher::SearchRequest;

use super::AppState;
use super::models::{SearchQuery, SearchResponse};

pub const KEYWORD_MISSING: &str = "Keyword is not specified.";
pub const DIRECTORY_MISSING: &str = "The specified directory does not exist.";
pub const SEARCH_CANCELLED: &str = "The search was cancelled.";
pub const INVALID_QUERY: &str = "The query string is invalid.";

pub async fn search_files_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = Instant::now();

    let Query(query) = query.map_err(|rejection| {
        tracing::warn!("rejected query string: {}", rejection.body_text());
        (StatusCode::BAD_REQUEST, INVALID_QUERY.to_string())
    })?;

    let keyword = match query.keyword {
        Some(keyword) if !keyword.trim().is_empty() => keyword,
        _ => return Err((StatusCode::BAD_REQUEST, KEYWORD_MISSING.to_string())),
    };

    let request = SearchRequest::new(state.directory.clone(), keyword);
    let cancel = CancellationToken::new();
    // axum drops this future when the client disconnects; the guard then cancels the probes
    let _guard = cancel.clone().drop_guard();

    let search = state.searcher.search(&request, &cancel);
    let result = match state.search_timeout {
        Some(limit) => match tokio::time::timeout(limit, search).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                Err(SearchError::Cancelled)
            }
        },
        None => search.await,
    };

    let result = result.map_err(error_response)?;
    tracing::info!(
        keyword = %request.keyword,
        matches = result.file_names.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "search completed"
    );
    Ok(Json(SearchResponse::from(result)))
}

fn error_response(err: SearchError) -> (StatusCode, String) {
    tracing::warn!("search failed: {:#}", err);
    match err {
        SearchError::InvalidKeyword => (StatusCode::BAD_REQUEST, KEYWORD_MISSING.to_string()),
        SearchError::DirectoryNotFound { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            DIRECTORY_MISSING.to_string(),
        ),
        SearchError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, SEARCH_CANCELLED.to_string()),
    }
}
