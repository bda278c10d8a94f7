use econo_core::connector::{SeriesProvider, SeriesQuery};
use econo_core::HttpClient;
use econo_providers::fred::FredConnector;
use econo_types::{
    EconError, Frequency, GeoSelector, HttpConfig, IndicatorRequest, TimeRange,
};
use httpmock::prelude::*;
use serde_json::json;

fn connector(server: &MockServer) -> FredConnector {
    FredConnector::new(HttpClient::new(&HttpConfig::default()).unwrap())
        .with_api_key("test-key")
        .with_base_url(server.base_url())
}

fn query(label: &str) -> SeriesQuery {
    SeriesQuery {
        indicator: IndicatorRequest::new(label),
        geo: GeoSelector::Country("USA".into()),
        range: TimeRange {
            start: Some("2023-01-01".into()),
            end: Some("2023-04-30".into()),
            relative: None,
        },
        frequency: None,
    }
}

#[tokio::test]
async fn alias_resolves_and_observations_normalize() {
    let server = MockServer::start_async().await;
    let obs = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/series/observations")
                .query_param("series_id", "UNRATE")
                .query_param("api_key", "test-key");
            then.status(200).json_body(json!({
                "observations": [
                    {"date": "2023-01-01", "value": "3.4"},
                    {"date": "2023-02-01", "value": "3.6"},
                    {"date": "2023-03-01", "value": "."},
                    {"date": "2023-04-01", "value": "3.4"}
                ]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/series").query_param("series_id", "UNRATE");
            then.status(200).json_body(json!({
                "seriess": [{
                    "id": "UNRATE",
                    "title": "Unemployment Rate",
                    "units": "Percent",
                    "frequency_short": "M",
                    "seasonal_adjustment_short": "SA",
                    "last_updated": "2023-05-05 07:44:02-05"
                }]
            }));
        })
        .await;

    let series = connector(&server)
        .fetch_series(&query("unemployment rate"))
        .await
        .unwrap()
        .series;
    obs.assert_async().await;

    assert_eq!(series.len(), 1);
    let s = &series[0];
    assert_eq!(s.metadata.indicator_code, "UNRATE");
    assert_eq!(s.metadata.unit, "Percent");
    assert_eq!(s.metadata.frequency, Some(Frequency::Monthly));
    assert_eq!(s.metadata.seasonal_adjustment.as_deref(), Some("SA"));
    assert_eq!(s.points.len(), 4);
    assert_eq!(s.points[0].date, "2023-01");
    // "." is a known-missing observation, not a parse failure.
    assert_eq!(s.points[2].value, None);
    // The secret never appears in the provenance echo.
    assert!(s.metadata.api_url_echo.contains("api_key=REDACTED"));
    assert!(!s.metadata.api_url_echo.contains("test-key"));
}

#[tokio::test]
async fn non_us_geography_yields_to_fallback() {
    let server = MockServer::start_async().await;
    let err = connector(&server)
        .fetch_series(&SeriesQuery {
            geo: GeoSelector::Country("DEU".into()),
            ..query("unemployment rate")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EconError::DataNotAvailable { .. }));
    assert!(err.yields_immediately());
}

#[tokio::test]
async fn empty_observations_is_data_not_available() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/series/observations");
            then.status(200).json_body(json!({"observations": []}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/series");
            then.status(200).json_body(json!({"seriess": []}));
        })
        .await;

    let err = connector(&server)
        .fetch_series(&query("unemployment rate"))
        .await
        .unwrap_err();
    assert!(matches!(err, EconError::DataNotAvailable { .. }));
}

#[tokio::test]
async fn unknown_label_falls_back_to_upstream_search() {
    let server = MockServer::start_async().await;
    let search = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/series/search")
                .query_param("search_text", "initial jobless claims");
            then.status(200).json_body(json!({
                "seriess": [{"id": "ICSA", "title": "Initial Claims"}]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/series/observations").query_param("series_id", "ICSA");
            then.status(200).json_body(json!({
                "observations": [{"date": "2023-01-07", "value": "205000"}]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/series");
            then.status(200).json_body(json!({
                "seriess": [{"id": "ICSA", "title": "Initial Claims", "units": "Number",
                              "frequency_short": "W", "seasonal_adjustment_short": "SA",
                              "last_updated": ""}]
            }));
        })
        .await;

    let series = connector(&server)
        .fetch_series(&query("initial jobless claims"))
        .await
        .unwrap()
        .series;
    search.assert_async().await;
    assert_eq!(series[0].metadata.indicator_code, "ICSA");
}
