//! Route handlers for the search API

use super::{AppError, AppState};
use crate::crawler::PageFetcher;
use crate::service::SearchError;
use anyhow::anyhow;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct CrawlRequest {
    keyword: Option<String>,
}

/// POST /crawl - start a keyword search
///
/// The body is parsed by hand so that malformed JSON and a missing keyword
/// produce the same 400 response as a keyword of the wrong length.
pub(crate) async fn start_crawl<F: PageFetcher>(
    State(state): State<AppState<F>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let keyword = match serde_json::from_slice::<CrawlRequest>(&body) {
        Ok(CrawlRequest {
            keyword: Some(keyword),
        }) => keyword,
        _ => {
            warn!("Invalid JSON format or missing keyword");
            return Err(AppError::with_status(
                StatusCode::BAD_REQUEST,
                anyhow!("Invalid JSON format or missing keyword"),
            ));
        }
    };

    info!("Received crawl request for keyword: {}", keyword);

    match state.service.start_search(&keyword) {
        Ok(id) => Ok((StatusCode::OK, Json(json!({ "id": id }))).into_response()),
        Err(e) => {
            warn!("Rejected crawl request for {:?}: {}", keyword, e);
            Err(AppError::with_status(rejection_status(&e), e.into()))
        }
    }
}

/// Status code for a rejected search submission
fn rejection_status(error: &SearchError) -> StatusCode {
    match error {
        SearchError::InvalidKeyword { .. } => StatusCode::BAD_REQUEST,
        SearchError::RunnerClosed => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// GET /crawl/:id - current snapshot of a search
pub(crate) async fn get_crawl<F: PageFetcher>(
    State(state): State<AppState<F>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let Some(snapshot) = state.service.snapshot(&id) else {
        warn!("Search not found for ID: {}", id);
        return Err(AppError::with_status(
            StatusCode::NOT_FOUND,
            anyhow!("Search not found"),
        ));
    };

    info!("Returning search result for ID: {}", id);
    let body = snapshot.to_json()?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// GET /health - Basic health check
pub(crate) async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "healthy"})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::crawler::HttpFetcher;
    use crate::service::SearchService;
    use std::sync::Arc;

    fn state() -> AppState<HttpFetcher> {
        let config = parse_config("[crawler]\nbase-url = \"http://127.0.0.1:9/\"\n").unwrap();
        let fetcher = HttpFetcher::new(&config.user_agent).unwrap();
        AppState {
            service: Arc::new(SearchService::from_config(&config, fetcher)),
        }
    }

    #[test]
    fn test_rejection_status() {
        let invalid = SearchError::InvalidKeyword {
            len: 2,
            min: 4,
            max: 32,
        };
        assert_eq!(rejection_status(&invalid), StatusCode::BAD_REQUEST);
        assert_eq!(
            rejection_status(&SearchError::RunnerClosed),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_start_crawl_during_shutdown_is_unavailable() {
        let state = state();
        state.service.shutdown().await;

        let result = start_crawl(State(state), Bytes::from(r#"{"keyword":"security"}"#)).await;

        let response = match result {
            Ok(_) => panic!("search started after shutdown"),
            Err(e) => e.into_response(),
        };
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_start_crawl_short_keyword_is_bad_request() {
        let result = start_crawl(State(state()), Bytes::from(r#"{"keyword":"abc"}"#)).await;

        let response = match result {
            Ok(_) => panic!("short keyword accepted"),
            Err(e) => e.into_response(),
        };
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
