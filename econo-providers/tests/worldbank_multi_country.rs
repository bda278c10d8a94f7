use econo_core::connector::{SeriesProvider, SeriesQuery};
use econo_core::HttpClient;
use econo_providers::worldbank::WorldBankConnector;
use econo_types::{GeoSelector, IndicatorRequest, TimeRange};
use httpmock::prelude::*;
use serde_json::json;

fn connector(server: &MockServer) -> WorldBankConnector {
    WorldBankConnector::new(HttpClient::new(&econo_types::HttpConfig::default()).unwrap())
        .with_base_url(server.base_url())
}

fn gdp_row(iso3: &str, year: i32, value: Option<f64>) -> serde_json::Value {
    json!({
        "indicator": {"id": "NY.GDP.MKTP.CD", "value": "GDP (current US$)"},
        "country": {"id": iso3, "value": iso3},
        "countryiso3code": iso3,
        "date": year.to_string(),
        "value": value,
        "unit": "",
        "obs_status": "",
        "decimal": 0
    })
}

#[tokio::test]
async fn multi_country_comparison_uses_one_semicolon_call() {
    let server = MockServer::start_async().await;
    let rows: Vec<serde_json::Value> = ["USA", "CHN", "JPN"]
        .iter()
        .flat_map(|iso3| {
            (2018..=2023).map(move |year| gdp_row(iso3, year, Some(1.0e12 + f64::from(year))))
        })
        .collect();
    let mock = server
        .mock_async(move |when, then| {
            when.method(GET)
                .path("/country/USA;CHN;JPN/indicator/NY.GDP.MKTP.CD")
                .query_param("format", "json")
                .query_param("date", "2018:2023");
            then.status(200)
                .json_body(json!([{"page": 1, "pages": 1, "per_page": 20000, "total": 18}, rows]));
        })
        .await;

    // A region selector carrying a pre-joined list exercises the provider's
    // native semicolon form directly.
    let series = connector(&server)
        .fetch_series(&SeriesQuery {
            indicator: IndicatorRequest::new("gdp"),
            geo: GeoSelector::Region("USA;CHN;JPN".into()),
            range: TimeRange {
                start: Some("2018-01-01".into()),
                end: Some("2023-12-31".into()),
                relative: None,
            },
            frequency: None,
        })
        .await
        .unwrap()
        .series;

    mock.assert_async().await;
    assert_eq!(series.len(), 1, "joined region list returns merged rows per listed country");
    let s = &series[0];
    assert_eq!(s.metadata.indicator_code, "NY.GDP.MKTP.CD");
    assert_eq!(s.points.len(), 6);
    assert_eq!(s.points.first().unwrap().date, "2018");
    assert_eq!(s.points.last().unwrap().date, "2023");
}

#[tokio::test]
async fn group_selector_expands_and_orders_series() {
    let server = MockServer::start_async().await;
    let rows: Vec<serde_json::Value> = ["BRA", "RUS", "IND", "CHN", "ZAF"]
        .iter()
        .flat_map(|iso3| (2020..=2021).map(move |y| gdp_row(iso3, y, Some(f64::from(y)))))
        .collect();
    server
        .mock_async(move |when, then| {
            when.method(GET)
                .path("/country/BRA;RUS;IND;CHN;ZAF/indicator/NY.GDP.MKTP.CD");
            then.status(200).json_body(json!([{"page": 1}, rows]));
        })
        .await;

    let series = connector(&server)
        .fetch_series(&SeriesQuery {
            indicator: IndicatorRequest::new("gdp"),
            geo: GeoSelector::Group(econo_types::geo::CountryGroup::Brics),
            range: TimeRange {
                start: Some("2020-01-01".into()),
                end: Some("2021-12-31".into()),
                relative: None,
            },
            frequency: None,
        })
        .await
        .unwrap()
        .series;

    assert_eq!(series.len(), 5);
    // Declared member order is preserved.
    assert_eq!(series[0].metadata.country_or_region, "Brazil");
    assert_eq!(series[3].metadata.country_or_region, "China");
    for s in &series {
        assert_eq!(s.points.len(), 2);
        assert_eq!(s.metadata.unit, "current US$");
    }
}

#[tokio::test]
async fn null_values_are_known_missing() {
    let server = MockServer::start_async().await;
    let rows = vec![
        gdp_row("USA", 2020, Some(2.1e13)),
        gdp_row("USA", 2021, None),
    ];
    server
        .mock_async(move |when, then| {
            when.method(GET).path("/country/USA/indicator/NY.GDP.MKTP.CD");
            then.status(200).json_body(json!([{"page": 1}, rows]));
        })
        .await;

    let series = connector(&server)
        .fetch_series(&SeriesQuery {
            indicator: IndicatorRequest::new("gdp"),
            geo: GeoSelector::Country("USA".into()),
            range: TimeRange {
                start: Some("2020-01-01".into()),
                end: Some("2021-12-31".into()),
                relative: None,
            },
            frequency: None,
        })
        .await
        .unwrap()
        .series;
    let s = &series[0];
    assert_eq!(s.points[0].value, Some(2.1e13));
    assert_eq!(s.points[1].value, None);
}
