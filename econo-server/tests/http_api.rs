use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use econo::ServiceContext;
use econo_types::EconConfig;
use tower::util::ServiceExt;

async fn test_app() -> axum::Router {
    // No LLM key and no provider keys: intent resolution is disabled and
    // only the keyless providers register. Enough to exercise the HTTP
    // surface and the error mapping.
    let config = EconConfig {
        request_budget: std::time::Duration::from_secs(5),
        index_path: ":memory:".to_string(),
        ..EconConfig::default()
    };
    let ctx = ServiceContext::initialize(config).await.unwrap();
    econo_server::app(Arc::clone(&ctx))
}

fn json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_status_and_providers() {
    let app = test_app().await;
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    let providers = body["providers_configured"].as_array().unwrap();
    assert!(providers.iter().any(|p| p == "worldbank"));
    // StatCan's WDS is keyless and registers without configuration.
    assert!(providers.iter().any(|p| p == "statcan"));
    // Genuinely keyed providers are absent without keys, not failing
    // startup.
    assert!(!providers.iter().any(|p| p == "fred"));
    assert!(!providers.iter().any(|p| p == "comtrade"));
}

#[tokio::test]
async fn query_without_llm_maps_to_503() {
    let app = test_app().await;
    let response = app
        .oneshot(json_request("/query", r#"{"query": "US unemployment rate"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["kind"], "intent");
}

#[tokio::test]
async fn malformed_body_is_client_error() {
    let app = test_app().await;
    let response = app
        .oneshot(json_request("/query", r#"{"nope": true}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn cache_stats_and_clear_round_trip() {
    let app = test_app().await;
    let response = app
        .clone()
        .oneshot(Request::get("/cache/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let stats: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(stats["entries"], 0);

    let response = app
        .oneshot(json_request("/cache/clear", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn stream_emits_named_events_and_terminates_with_done() {
    let app = test_app().await;
    let response = app
        .oneshot(json_request(
            "/query/stream",
            r#"{"query": "US unemployment rate"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    // Without an LLM the pipeline fails fast: the stream still carries a
    // named error event and the terminating done event.
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("event: error"), "missing error event in {text}");
    assert!(text.contains("event: done"), "missing done event in {text}");
    let done_pos = text.rfind("event: done").unwrap();
    let error_pos = text.rfind("event: error").unwrap();
    assert!(error_pos < done_pos, "done must terminate the stream");
}
