//! Highlight service
//!
//! Serves `GET` and `POST` on [`HIGHLIGHT_PATH`] with the local highlighter,
//! so a [`DefaultHighlighter`](crate::highlighter::DefaultHighlighter) can be
//! pointed at another process.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;

use crate::error::HighlightError;
use crate::highlighter::{
    HighlightOptions, HighlightRequest, LocalHighlighter, ThemeSelection, HIGHLIGHT_PATH,
};

/// Query string of a GET request; `theme` and `options` hold JSON
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HighlightQuery {
    pub code: String,
    pub lang: String,
    pub theme: Option<String>,
    pub options: Option<String>,
}

impl HighlightQuery {
    fn into_request(self) -> Result<HighlightRequest, serde_json::Error> {
        let theme = match self.theme.as_deref() {
            Some(json) => serde_json::from_str(json)?,
            None => ThemeSelection::default(),
        };
        let options = match self.options.as_deref() {
            Some(json) => serde_json::from_str(json)?,
            None => HighlightOptions::default(),
        };
        Ok(HighlightRequest {
            code: self.code,
            lang: self.lang,
            theme,
            options,
        })
    }
}

pub fn router(highlighter: Arc<LocalHighlighter>) -> Router {
    Router::new()
        .route(HIGHLIGHT_PATH, get(highlight_get).post(highlight_post))
        .with_state(highlighter)
}

async fn highlight_get(
    State(highlighter): State<Arc<LocalHighlighter>>,
    Query(query): Query<HighlightQuery>,
) -> Response {
    match query.into_request() {
        Ok(request) => run(highlighter, request).await,
        Err(e) => {
            tracing::debug!("Rejecting highlight query: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": format!("invalid JSON parameter: {}", e)})),
            )
                .into_response()
        }
    }
}

async fn highlight_post(
    State(highlighter): State<Arc<LocalHighlighter>>,
    Json(request): Json<HighlightRequest>,
) -> Response {
    run(highlighter, request).await
}

async fn run(highlighter: Arc<LocalHighlighter>, request: HighlightRequest) -> Response {
    let lang = request.lang.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        highlighter.highlight(&request.code, &request.lang, &request.theme, &request.options)
    })
    .await;

    match outcome {
        Ok(Ok(result)) => Json(result).into_response(),
        Ok(Err(e @ HighlightError::Initialization(_))) => {
            tracing::warn!("Highlight request for {:?} failed: {}", lang, e);
            error_response(e.to_string())
        }
        Ok(Err(e)) => error_response(e.to_string()),
        Err(e) => {
            tracing::error!("Highlight task panicked: {}", e);
            error_response("highlight task failed".to_string())
        }
    }
}

fn error_response(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
        .into_response()
}

/// Bind `listen` and serve until Ctrl-C
pub async fn serve(listen: &str, highlighter: Arc<LocalHighlighter>) -> std::io::Result<()> {
    let listener = TcpListener::bind(listen).await?;
    tracing::info!("Serving highlights on http://{}{}", listener.local_addr()?, HIGHLIGHT_PATH);

    axum::serve(listener, router(highlighter))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
}
