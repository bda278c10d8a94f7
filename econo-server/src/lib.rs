//! Axum application for the econo query API.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use econo::{EconError, ProgressEvent, ProgressSink, ServiceContext};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Inbound body for `/query` and `/query/stream`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// Natural-language query text.
    pub query: String,
    /// Opaque conversation handle; its tail disambiguates follow-ups.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Taxonomy-mapped error response.
struct ApiError(EconError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status =
            StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let suggestions = match &self.0 {
            EconError::Ambiguous { suggestions, .. }
            | EconError::IndicatorUnknown { suggestions, .. } => suggestions.clone(),
            _ => Vec::new(),
        };
        let mut body = json!({
            "error": {
                "kind": kind,
                "message": self.0.to_string(),
            }
        });
        if !suggestions.is_empty() {
            body["error"]["suggestions"] = json!(suggestions);
        }
        (status, Json(body)).into_response()
    }
}

/// Build the application router.
pub fn app(ctx: Arc<ServiceContext>) -> Router {
    Router::new()
        .route("/query", post(query))
        .route("/query/stream", post(query_stream))
        .route("/cache/stats", get(cache_stats))
        .route("/cache/clear", post(cache_clear))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

async fn query(
    State(ctx): State<Arc<ServiceContext>>,
    Json(req): Json<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = ctx
        .orchestrator()
        .query(
            &req.query,
            req.conversation_id.as_deref(),
            &ProgressSink::disabled(),
        )
        .await
        .map_err(ApiError)?;
    Ok(Json(result))
}

/// Aborts the pipeline task when the SSE stream is dropped, propagating
/// client disconnects as cancellation.
struct AbortOnDrop(tokio::task::JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn query_stream(
    State(ctx): State<Arc<ServiceContext>>,
    Json(req): Json<QueryRequest>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let (sink, rx) = ProgressSink::channel(64);
    let handle = tokio::spawn(async move {
        // The orchestrator emits data/error and the terminal done event
        // itself; the result value has already been streamed.
        let _ = ctx
            .orchestrator()
            .query(&req.query, req.conversation_id.as_deref(), &sink)
            .await;
    });

    let stream = futures::stream::unfold(
        (rx, AbortOnDrop(handle)),
        |(mut rx, guard)| async move {
            let event = rx.recv().await?;
            Some((Ok(to_sse_event(&event)), (rx, guard)))
        },
    );
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse_event(event: &ProgressEvent) -> Event {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(event.name()).data(payload)
}

async fn cache_stats(State(ctx): State<Arc<ServiceContext>>) -> impl IntoResponse {
    Json(ctx.cache_stats().await)
}

async fn cache_clear(State(ctx): State<Arc<ServiceContext>>) -> impl IntoResponse {
    ctx.cache_clear().await;
    Json(json!({ "ok": true }))
}

async fn health(State(ctx): State<Arc<ServiceContext>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "providers_configured": ctx.orchestrator().provider_names(),
        "breakers": ctx.breaker_snapshots(),
    }))
}
