use econo_core::connector::{SeriesProvider, SeriesQuery};
use econo_core::HttpClient;
use econo_providers::oecd::OecdConnector;
use econo_types::{EconError, Frequency, GeoSelector, IndicatorRequest, Qualifier, TimeRange};
use httpmock::prelude::*;
use serde_json::json;

fn connector(server: &MockServer) -> OecdConnector {
    OecdConnector::new(HttpClient::new(&econo_types::HttpConfig::default()).unwrap())
        .with_base_url(server.base_url())
}

fn dsd_message() -> serde_json::Value {
    json!({
        "data": {
            "dataStructures": [{
                "dataStructureComponents": {
                    "dimensionList": {
                        "dimensions": [
                            {"id": "FREQ", "position": 0, "values": [
                                {"id": "A", "name": "Annual"}, {"id": "M", "name": "Monthly"}
                            ]},
                            {"id": "REF_AREA", "position": 1, "values": [
                                {"id": "DEU", "name": "Germany"}, {"id": "FRA", "name": "France"}
                            ]},
                            {"id": "UNIT_MEASURE", "position": 2, "values": [
                                {"id": "PC_ACT", "name": "Percent of active population"},
                                {"id": "THS_PER", "name": "Thousand persons"}
                            ]}
                        ],
                        "timeDimensions": [{"id": "TIME_PERIOD", "values": []}]
                    }
                }
            }]
        }
    })
}

fn data_message() -> serde_json::Value {
    json!({
        "data": {
            "structures": [{
                "dimensions": {
                    "series": [
                        {"id": "FREQ", "values": [{"id": "A", "name": "Annual"}]},
                        {"id": "REF_AREA", "values": [{"id": "DEU", "name": "Germany"}]},
                        {"id": "UNIT_MEASURE", "values": [
                            {"id": "PC_ACT", "name": "Percent of active population"},
                            {"id": "THS_PER", "name": "Thousand persons"}
                        ]}
                    ],
                    "observation": [
                        {"id": "TIME_PERIOD", "values": [
                            {"id": "2022", "name": "2022"}, {"id": "2023", "name": "2023"}
                        ]}
                    ]
                }
            }],
            "dataSets": [{
                "series": {
                    "0:0:0": {"observations": {"0": [3.1], "1": [3.0]}},
                    "0:0:1": {"observations": {"0": [1426.0], "1": [1397.0]}}
                }
            }]
        }
    })
}

#[tokio::test]
async fn resolves_dataflow_fetches_dsd_and_prefers_rate_unit() {
    let server = MockServer::start_async().await;
    let dsd = server
        .mock_async(|when, then| {
            when.method(GET)
                .path_includes("/dataflow/OECD.SDD.TPS/DSD_LFS@DF_IALFS_UNE_M/");
            then.status(200).json_body(dsd_message());
        })
        .await;
    let data = server
        .mock_async(|when, then| {
            when.method(GET)
                .path_includes("/data/OECD.SDD.TPS,DSD_LFS@DF_IALFS_UNE_M,+/A.DEU.")
                .query_param("dimensionAtObservation", "TIME_PERIOD");
            then.status(200).json_body(data_message());
        })
        .await;

    let series = connector(&server)
        .fetch_series(&SeriesQuery {
            indicator: IndicatorRequest::new("unemployment rate"),
            geo: GeoSelector::Country("DEU".into()),
            range: TimeRange {
                start: Some("2022-01-01".into()),
                end: Some("2023-12-31".into()),
                relative: None,
            },
            frequency: Some(Frequency::Annual),
        })
        .await
        .unwrap()
        .series;
    dsd.assert_async().await;
    data.assert_async().await;

    assert_eq!(series.len(), 1);
    let s = &series[0];
    assert_eq!(s.metadata.country_or_region, "Germany");
    assert_eq!(s.metadata.unit, "Percent of active population");
    assert_eq!(s.points[0].value, Some(3.1));
    assert_eq!(s.metadata.frequency, Some(Frequency::Annual));
}

#[tokio::test]
async fn second_fetch_reuses_cached_dsd() {
    let server = MockServer::start_async().await;
    let dsd = server
        .mock_async(|when, then| {
            when.method(GET).path_includes("/dataflow/");
            then.status(200).json_body(dsd_message());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_includes("/data/");
            then.status(200).json_body(data_message());
        })
        .await;

    let c = connector(&server);
    let q = SeriesQuery {
        indicator: IndicatorRequest::new("unemployment rate"),
        geo: GeoSelector::Country("DEU".into()),
        range: TimeRange::default(),
        frequency: Some(Frequency::Annual),
    };
    c.fetch_series(&q).await.unwrap();
    c.fetch_series(&q).await.unwrap();
    dsd.assert_async().await; // exactly one DSD fetch despite two data fetches
}

#[tokio::test]
async fn growth_intent_without_transformation_dimension_fails_with_hint() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_includes("/dataflow/");
            then.status(200).json_body(dsd_message());
        })
        .await;

    let err = connector(&server)
        .fetch_series(&SeriesQuery {
            indicator: IndicatorRequest {
                label: "unemployment rate".into(),
                explicit_code: None,
                qualifiers: vec![Qualifier::Growth],
            },
            geo: GeoSelector::Country("DEU".into()),
            range: TimeRange::default(),
            frequency: None,
        })
        .await
        .unwrap_err();
    match err {
        EconError::DataNotAvailable { hint, .. } => {
            assert!(hint.unwrap().contains("switch providers"));
        }
        other => unreachable!("expected DataNotAvailable, got {other:?}"),
    }
}
