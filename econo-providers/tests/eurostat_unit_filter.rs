use econo_core::connector::{SeriesProvider, SeriesQuery};
use econo_core::HttpClient;
use econo_providers::eurostat::EurostatConnector;
use econo_types::{EconError, Frequency, GeoSelector, IndicatorRequest, TimeRange};
use httpmock::prelude::*;
use serde_json::json;

fn connector(server: &MockServer) -> EurostatConnector {
    EurostatConnector::new(HttpClient::new(&econo_types::HttpConfig::default()).unwrap())
        .with_base_url(server.base_url())
}

/// An une_rt_a-shaped cube whose flat value array interleaves the rate
/// (percent of active population) with population counts in thousands.
fn unemployment_cube() -> serde_json::Value {
    json!({
        "version": "2.0",
        "class": "dataset",
        "id": ["freq", "unit", "geo", "time"],
        "size": [1, 2, 1, 6],
        "dimension": {
            "freq": {"category": {"index": {"A": 0}, "label": {"A": "Annual"}}},
            "unit": {"category": {
                "index": {"PC_ACT": 0, "THS_PER": 1},
                "label": {
                    "PC_ACT": "Percentage of population in the labour force",
                    "THS_PER": "Thousand persons"
                }
            }},
            "geo": {"category": {"index": {"DE": 0}, "label": {"DE": "Germany"}}},
            "time": {"category": {"index": {
                "2019": 0, "2020": 1, "2021": 2, "2022": 3, "2023": 4, "2024": 5
            }}}
        },
        "value": [
            3.0, 3.6, 3.6, 3.1, 3.0, 3.4,
            1374.0, 1645.0, 1621.0, 1426.0, 1397.0, 1570.0
        ]
    })
}

#[tokio::test]
async fn selects_percent_of_active_population_from_mixed_units() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/une_rt_a")
                .query_param("format", "JSON")
                .query_param("geo", "DE")
                .query_param("sinceTimePeriod", "2019")
                .query_param("untilTimePeriod", "2024");
            then.status(200).json_body(unemployment_cube());
        })
        .await;

    let series = connector(&server)
        .fetch_series(&SeriesQuery {
            indicator: IndicatorRequest::new("unemployment rate"),
            geo: GeoSelector::Country("DEU".into()),
            range: TimeRange {
                start: Some("2019-01-01".into()),
                end: Some("2024-12-31".into()),
                relative: None,
            },
            frequency: Some(Frequency::Annual),
        })
        .await
        .unwrap()
        .series;
    mock.assert_async().await;

    assert_eq!(series.len(), 1);
    let s = &series[0];
    assert_eq!(s.metadata.indicator_code, "une_rt_a");
    assert_eq!(s.metadata.country_or_region, "Germany");
    assert_eq!(s.metadata.frequency, Some(Frequency::Annual));
    assert_eq!(s.points.len(), 6);

    // The adapter must have sliced the rate out of a cube that also
    // carried thousand-person counts.
    let v2019 = s.points[0].value.unwrap();
    let v2024 = s.points[5].value.unwrap();
    assert!((2.5..3.3).contains(&v2019), "2019 value {v2019} is the rate, not a count");
    assert!((3.0..3.8).contains(&v2024), "2024 value {v2024} is the rate, not a count");
    assert!(s
        .metadata
        .unit
        .to_lowercase()
        .contains("percentage of population"));
}

#[tokio::test]
async fn non_european_geography_yields_to_fallback() {
    let server = MockServer::start_async().await;
    let err = connector(&server)
        .fetch_series(&SeriesQuery {
            indicator: IndicatorRequest::new("unemployment rate"),
            geo: GeoSelector::Country("BRA".into()),
            range: TimeRange::default(),
            frequency: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EconError::DataNotAvailable { .. }));
    assert!(err.yields_immediately());
}

#[tokio::test]
async fn missing_geo_in_response_is_not_available() {
    let server = MockServer::start_async().await;
    let mut cube = unemployment_cube();
    cube["dimension"]["geo"]["category"] =
        json!({"index": {"FR": 0}, "label": {"FR": "France"}});
    server
        .mock_async(move |when, then| {
            when.method(GET).path("/une_rt_a");
            then.status(200).json_body(cube.clone());
        })
        .await;

    let err = connector(&server)
        .fetch_series(&SeriesQuery {
            indicator: IndicatorRequest::new("unemployment rate"),
            geo: GeoSelector::Country("DEU".into()),
            range: TimeRange::default(),
            frequency: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EconError::DataNotAvailable { .. }));
}
