use econo_core::http::HttpClient;
use econo_types::{EconError, HttpConfig};
use httpmock::prelude::*;

fn client() -> HttpClient {
    HttpClient::new(&HttpConfig::default()).unwrap()
}

#[tokio::test]
async fn get_returns_body_and_status() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/obs");
            then.status(200).json_body(serde_json::json!({"ok": true}));
        })
        .await;

    let resp = client()
        .get("test", &server.url("/obs"), &[])
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(resp.status, 200);
    let value: serde_json::Value = resp.json().unwrap();
    assert_eq!(value["ok"], true);
}

#[tokio::test]
async fn non_2xx_is_returned_not_raised() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body("no such series");
        })
        .await;

    let resp = client()
        .get("test", &server.url("/missing"), &[])
        .await
        .unwrap();
    assert_eq!(resp.status, 404);

    let err = resp.ensure_success("test").unwrap_err();
    assert!(matches!(err, EconError::Upstream { status: 404, .. }));
}

#[tokio::test]
async fn status_429_maps_to_rate_limited() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/throttled");
            then.status(429);
        })
        .await;

    let resp = client()
        .get("comtrade", &server.url("/throttled"), &[])
        .await
        .unwrap();
    let err = resp.ensure_success("comtrade").unwrap_err();
    assert!(matches!(err, EconError::RateLimited { .. }));
}

#[tokio::test]
async fn headers_are_forwarded() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/keyed")
                .header("x-api-key", "k123");
            then.status(200).body("[]");
        })
        .await;

    client()
        .get("statcan", &server.url("/keyed"), &[("x-api-key", "k123")])
        .await
        .unwrap();
    mock.assert_async().await;
}
