use anyhow::Result;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use wordseek::api::handlers::{DIRECTORY_MISSING, INVALID_QUERY, KEYWORD_MISSING, SEARCH_CANCELLED};
use wordseek::api::{AppState, create_router};
use wordseek::config::AppConfig;
use wordseek::searcher::DirectoryKeywordSearcher;

mod test_helpers {
    use super::*;
    use std::path::Path;

    pub fn router_for(dir: &Path) -> axum::Router {
        create_router(Arc::new(AppState::new(dir)))
    }

    pub async fn get(router: axum::Router, uri: &str) -> Result<(StatusCode, Option<String>, Vec<u8>)> {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty())?)
            .await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX).await?.to_vec();
        Ok((status, content_type, body))
    }

    pub fn scenario_dir() -> Result<tempfile::TempDir> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("a.txt"), "hello world")?;
        std::fs::write(dir.path().join("b.txt"), "Hello Keyword")?;
        std::fs::write(dir.path().join("c.txt"), "nothing here")?;
        Ok(dir)
    }
}

use test_helpers::*;

#[tokio::test]
async fn test_search_returns_wrapped_file_names() -> Result<()> {
    let dir = scenario_dir()?;

    let (status, content_type, body) = get(router_for(dir.path()), "/files/search?keyword=keyword").await?;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap_or_default().starts_with("application/json"));
    let body: Value = serde_json::from_slice(&body)?;
    assert_eq!(body, json!({ "fileNames": [ { "fileName": "b.txt" } ] }));
    Ok(())
}

#[tokio::test]
async fn test_search_without_matches_returns_empty_array() -> Result<()> {
    let dir = scenario_dir()?;

    let (status, _, body) = get(router_for(dir.path()), "/files/search?keyword=absent").await?;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body)?;
    assert_eq!(body, json!({ "fileNames": [] }));
    Ok(())
}

#[tokio::test]
async fn test_search_url_encoded_keyword() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("phrase.txt"), "say Hello World twice")?;
    std::fs::write(dir.path().join("other.txt"), "hello")?;

    let (status, _, body) = get(router_for(dir.path()), "/files/search?keyword=hello%20world").await?;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body)?;
    assert_eq!(body, json!({ "fileNames": [ { "fileName": "phrase.txt" } ] }));
    Ok(())
}

#[tokio::test]
async fn test_missing_keyword_is_bad_request() -> Result<()> {
    let dir = scenario_dir()?;

    for uri in ["/files/search", "/files/search?keyword=", "/files/search?keyword=%20%20"] {
        let (status, _, body) = get(router_for(dir.path()), uri).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "uri: {uri}");
        assert_eq!(String::from_utf8(body)?, KEYWORD_MISSING);
    }
    Ok(())
}

#[tokio::test]
async fn test_missing_directory_is_server_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("not_there");

    let (status, _, body) = get(router_for(&missing), "/files/search?keyword=keyword").await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = String::from_utf8(body)?;
    assert_eq!(body, DIRECTORY_MISSING);
    assert!(!body.contains("not_there"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_not_found() -> Result<()> {
    let dir = scenario_dir()?;

    let (status, _, _) = get(router_for(dir.path()), "/files").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_repeated_keyword_is_bad_request_with_fixed_message() -> Result<()> {
    let dir = scenario_dir()?;

    let (status, _, body) = get(router_for(dir.path()), "/files/search?keyword=a&keyword=b").await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(String::from_utf8(body)?, INVALID_QUERY);
    Ok(())
}

#[tokio::test]
async fn test_search_timeout_is_service_unavailable() -> Result<()> {
    // one file at a time over many files keeps the search busy well past the deadline
    let dir = tempfile::tempdir()?;
    for i in 0..2000 {
        std::fs::write(dir.path().join(format!("file_{i:04}.txt")), "keyword")?;
    }
    let state = AppState {
        searcher: DirectoryKeywordSearcher::new().with_max_concurrent_probes(Some(1)),
        directory: dir.path().to_path_buf(),
        search_timeout: Some(Duration::ZERO),
    };

    let (status, _, body) = get(create_router(Arc::new(state)), "/files/search?keyword=keyword").await?;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(String::from_utf8(body)?, SEARCH_CANCELLED);
    Ok(())
}

#[tokio::test]
async fn test_state_from_config_serves_configured_directory() -> Result<()> {
    let dir = scenario_dir()?;
    let config = AppConfig::from_value(json!({
        "FileSearchOptions": {
            "ExamplesDirectoryPath": dir.path(),
            "MaxConcurrentProbes": 2,
            "SearchTimeoutSecs": 60
        }
    }))?;

    let state = AppState::from_config(&config);
    assert_eq!(state.directory, dir.path());
    assert_eq!(state.searcher.max_concurrent_probes(), Some(2));
    assert_eq!(state.search_timeout, Some(Duration::from_secs(60)));

    let (status, _, body) = get(create_router(Arc::new(state)), "/files/search?keyword=KEYWORD").await?;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body)?;
    assert_eq!(body, json!({ "fileNames": [ { "fileName": "b.txt" } ] }));
    Ok(())
}
