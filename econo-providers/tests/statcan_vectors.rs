use econo_core::connector::{SeriesProvider, SeriesQuery};
use econo_core::HttpClient;
use econo_providers::statcan::StatcanConnector;
use econo_types::{GeoSelector, IndicatorRequest, TimeRange};
use httpmock::prelude::*;
use serde_json::json;

fn connector(server: &MockServer) -> StatcanConnector {
    StatcanConnector::new(HttpClient::new(&econo_types::HttpConfig::default()).unwrap())
        .with_base_url(server.base_url())
}

fn query() -> SeriesQuery {
    SeriesQuery {
        indicator: IndicatorRequest::new("cpi"),
        geo: GeoSelector::Country("CAN".into()),
        range: TimeRange {
            start: Some("2023-01-01".into()),
            end: Some("2023-12-31".into()),
            relative: None,
        },
        frequency: None,
    }
}

fn series_info(vector_id: u64, release: &str) -> serde_json::Value {
    json!([{
        "status": "SUCCESS",
        "object": {
            "vectorId": vector_id,
            "productId": 18100004u64,
            "coordinate": "2.2.0.0.0.0.0.0.0.0",
            "SeriesTitleEn": "Consumer Price Index, all-items",
            "frequencyCode": 6,
            "scalarFactorCode": 0,
            "releaseTime": release
        }
    }])
}

fn data_points(vector_id: u64) -> serde_json::Value {
    json!([{
        "status": "SUCCESS",
        "object": {
            "vectorId": vector_id,
            "vectorDataPoint": [
                {"refPer": "2023-01-01", "value": 153.9},
                {"refPer": "2023-02-01", "value": 154.5},
                {"refPer": "2023-03-01", "value": 155.3}
            ]
        }
    }])
}

fn recent_release() -> String {
    let now = chrono::Utc::now().date_naive();
    format!("{}T08:30", now - chrono::Duration::days(20))
}

#[tokio::test]
async fn fresh_vector_is_fetched_directly() {
    let server = MockServer::start_async().await;
    server
        .mock_async(move |when, then| {
            when.method(POST).path("/getSeriesInfoFromVector");
            then.status(200).json_body(series_info(41690973, &recent_release()));
        })
        .await;
    let data = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/getDataFromVectorsAndLatestNPeriods")
                .json_body_includes(r#"[{"vectorId": 41690973}]"#);
            then.status(200).json_body(data_points(41690973));
        })
        .await;

    let series = connector(&server).fetch_series(&query()).await.unwrap().series;
    data.assert_async().await;

    let s = &series[0];
    assert_eq!(s.metadata.indicator_code, "v41690973");
    assert_eq!(s.points[0].date, "2023-01");
    assert_eq!(s.points[0].value, Some(153.9));
}

#[tokio::test]
async fn archived_vector_discovers_successor_and_reissues() {
    let server = MockServer::start_async().await;
    // Monthly cadence, last released over a year ago: archived.
    server
        .mock_async(|when, then| {
            when.method(POST).path("/getSeriesInfoFromVector");
            then.status(200).json_body(series_info(41690973, "2020-03-18T08:30"));
        })
        .await;
    let successor = server
        .mock_async(|when, then| {
            when.method(POST).path("/getSeriesInfoFromCubePidCoord");
            then.status(200).json_body(series_info(99990001, "2020-03-18T08:30"));
        })
        .await;
    let data = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/getDataFromVectorsAndLatestNPeriods")
                .json_body_includes(r#"[{"vectorId": 99990001}]"#);
            then.status(200).json_body(data_points(99990001));
        })
        .await;

    let series = connector(&server).fetch_series(&query()).await.unwrap().series;
    successor.assert_async().await;
    data.assert_async().await;
    assert_eq!(series[0].metadata.indicator_code, "v99990001");
}

#[tokio::test]
async fn wds_failure_status_maps_to_provider_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/getSeriesInfoFromVector");
            then.status(200)
                .json_body(json!([{"status": "FAILED", "object": null}]));
        })
        .await;

    let err = connector(&server).fetch_series(&query()).await.unwrap_err();
    assert!(matches!(err, econo_types::EconError::Provider { .. }));
}
