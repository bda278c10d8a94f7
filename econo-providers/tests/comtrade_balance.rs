use econo_core::connector::{TradeFlowProvider, TradeQuery};
use econo_core::HttpClient;
use econo_providers::comtrade::ComtradeConnector;
use econo_types::{EconError, GeoSelector, TimeRange, TradeFlow};
use httpmock::prelude::*;
use serde_json::json;

fn connector(server: &MockServer) -> ComtradeConnector {
    ComtradeConnector::new(HttpClient::new(&econo_types::HttpConfig::default()).unwrap())
        .with_api_key("sub-key")
        .with_base_url(server.base_url())
}

fn trade_query(flow: TradeFlow) -> TradeQuery {
    TradeQuery {
        reporter: GeoSelector::Country("CAN".into()),
        partner: Some(GeoSelector::Country("USA".into())),
        product: "total".into(),
        flow,
        range: TimeRange {
            start: Some("2015-01-01".into()),
            end: Some("2020-12-31".into()),
            relative: None,
        },
    }
}

fn rows(flow_code: &str, base: f64) -> serde_json::Value {
    let data: Vec<serde_json::Value> = (2015..=2020)
        .map(|year| {
            json!({
                "period": year,
                "reporterCode": 124,
                "partnerCode": 842,
                "flowCode": flow_code,
                "cmdCode": "TOTAL",
                "primaryValue": base + f64::from(year - 2015) * 1.0e9
            })
        })
        .collect();
    json!({"data": data})
}

#[tokio::test]
async fn balance_equals_exports_minus_imports_per_period() {
    let server = MockServer::start_async().await;
    let exports_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/C/A/HS")
                .query_param("reporterCode", "124")
                .query_param("partnerCode", "842")
                .query_param("flowCode", "X")
                .query_param("cmdCode", "TOTAL");
            then.status(200).json_body(rows("X", 3.0e11));
        })
        .await;
    let imports_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/C/A/HS")
                .query_param("flowCode", "M");
            then.status(200).json_body(rows("M", 2.8e11));
        })
        .await;

    let c = connector(&server);
    let exports = c.fetch_trade(&trade_query(TradeFlow::Exports)).await.unwrap();
    let imports = c.fetch_trade(&trade_query(TradeFlow::Imports)).await.unwrap();
    let balance = c.fetch_trade(&trade_query(TradeFlow::Balance)).await.unwrap();

    exports_mock.assert_hits_async(2).await; // exports fetch + balance's exports leg
    imports_mock.assert_hits_async(2).await;

    assert_eq!(balance.points.len(), 6);
    for (i, point) in balance.points.iter().enumerate() {
        let x = exports.points[i].value.unwrap();
        let m = imports.points[i].value.unwrap();
        assert_eq!(point.value.unwrap(), x - m, "balance law violated at {}", point.date);
    }
    assert!(balance.metadata.indicator_display.starts_with("Trade balance"));
    assert!(!balance.metadata.api_url_echo.contains("sub-key"));
}

#[tokio::test]
async fn world_partner_uses_aggregate_code_zero() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/C/A/HS")
                .query_param("partnerCode", "0")
                .query_param("flowCode", "X");
            then.status(200).json_body(rows("X", 5.0e11));
        })
        .await;

    let series = connector(&server)
        .fetch_trade(&TradeQuery {
            partner: None,
            ..trade_query(TradeFlow::Exports)
        })
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(series.points.len(), 6);
}

#[tokio::test]
async fn product_names_resolve_to_hs_codes() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/C/A/HS").query_param("cmdCode", "2709");
            then.status(200).json_body(rows("X", 1.0e10));
        })
        .await;

    connector(&server)
        .fetch_trade(&TradeQuery {
            product: "crude oil".into(),
            ..trade_query(TradeFlow::Exports)
        })
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn rate_limit_carries_retry_hint() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/C/A/HS");
            then.status(429).json_body(json!({"retryAfter": 30}));
        })
        .await;

    let err = connector(&server)
        .fetch_trade(&trade_query(TradeFlow::Exports))
        .await
        .unwrap_err();
    match err {
        EconError::RateLimited { retry_after_ms, .. } => {
            assert_eq!(retry_after_ms, Some(30_000));
        }
        other => unreachable!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_data_is_not_available() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/C/A/HS");
            then.status(200).json_body(json!({"data": []}));
        })
        .await;

    let err = connector(&server)
        .fetch_trade(&trade_query(TradeFlow::Exports))
        .await
        .unwrap_err();
    assert!(matches!(err, EconError::DataNotAvailable { .. }));
}
