use econo_types::geo::CountryGroup;
use econo_types::{
    Frequency, GeoSelector, IndicatorRequest, ParsedIntent, Qualifier, RelativeRange, TimeRange,
};

#[test]
fn parsed_intent_round_trips_through_json() {
    let intent = ParsedIntent {
        providers: vec!["fred".into()],
        indicators: vec![IndicatorRequest {
            label: "unemployment rate".into(),
            explicit_code: Some("UNRATE".into()),
            qualifiers: vec![Qualifier::SeasonallyAdjusted],
        }],
        geography: vec![GeoSelector::Country("USA".into())],
        time_range: TimeRange {
            start: None,
            end: None,
            relative: Some(RelativeRange::LastNYears { n: 5 }),
        },
        frequency: Some(Frequency::Monthly),
        is_trade_query: false,
        is_comparison: false,
        is_exchange_rate: false,
        is_crypto: false,
    };

    let json = serde_json::to_string(&intent).unwrap();
    let back: ParsedIntent = serde_json::from_str(&json).unwrap();
    assert_eq!(back, intent);
}

#[test]
fn llm_style_payload_parses_with_defaults() {
    // The resolver's structured-output prompt allows omitting empty fields;
    // every flag and list must default.
    let json = r#"{
        "indicators": [{"label": "gdp"}],
        "geography": [
            {"kind": "country", "value": "USA"},
            {"kind": "group", "value": "G7"},
            {"kind": "world"}
        ]
    }"#;
    let intent: ParsedIntent = serde_json::from_str(json).unwrap();
    assert_eq!(intent.indicators.len(), 1);
    assert_eq!(intent.geography[1], GeoSelector::Group(CountryGroup::G7));
    assert_eq!(intent.geography[2], GeoSelector::World);
    assert!(intent.providers.is_empty());
    assert!(!intent.is_trade_query);
    assert_eq!(intent.branch_count(), 3);
}

#[test]
fn qualifier_names_are_snake_case() {
    let q: Qualifier = serde_json::from_str("\"seasonally_adjusted\"").unwrap();
    assert_eq!(q, Qualifier::SeasonallyAdjusted);
    assert_eq!(
        serde_json::to_string(&Qualifier::PerCapita).unwrap(),
        "\"per_capita\""
    );
}

#[test]
fn time_range_years_requires_both_endpoints() {
    let range = TimeRange {
        start: Some("2018-01-01".into()),
        end: Some("2023-12-31".into()),
        relative: None,
    };
    assert_eq!(range.years(), Some((2018, 2023)));
    assert_eq!(TimeRange::default().years(), None);
}
