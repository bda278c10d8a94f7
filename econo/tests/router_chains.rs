use std::sync::Arc;

use econo::{Router, LOW_PRIORITY_PROVIDER};
use econo_core::connector::EconConnector;
use econo_index::{IndicatorRecord, ScoredIndicator};
use econo_middleware::BreakerRegistry;
use econo_mock::MockConnector;
use econo_types::{
    BreakerConfig, GeoSelector, IndicatorRequest, LowPriorityPolicy, ParsedIntent, RouterConfig,
};

fn connectors(names: &[&'static str]) -> Vec<Arc<dyn EconConnector>> {
    names
        .iter()
        .map(|n| Arc::new(MockConnector::named(n)) as Arc<dyn EconConnector>)
        .collect()
}

fn breakers() -> BreakerRegistry {
    BreakerRegistry::new(BreakerConfig::default())
}

fn candidate(provider: &str, code: &str, score: f64) -> ScoredIndicator {
    ScoredIndicator {
        record: IndicatorRecord {
            provider: provider.into(),
            code: code.into(),
            display_name: code.into(),
            description: String::new(),
            unit: None,
            frequency: None,
            geo_coverage: None,
            keywords: String::new(),
            category: String::new(),
            popularity_score: 0.0,
        },
        score,
        matched_in: econo_index::MatchField::Name,
        low_confidence: false,
    }
}

fn chain_names(router: &Router, intent: &ParsedIntent, candidates: &[ScoredIndicator]) -> Vec<String> {
    let all = connectors(&[
        "fred",
        "worldbank",
        "imf",
        "coingecko",
        "exchangerate",
        "comtrade",
        "oecd",
        "eurostat",
        "statcan",
    ]);
    let indicator = intent
        .indicators
        .first()
        .cloned()
        .unwrap_or_else(|| IndicatorRequest::new("gdp"));
    router
        .plan(intent, &indicator, candidates, &all, &breakers())
        .chain
        .iter()
        .map(|c| c.name().to_string())
        .collect()
}

#[test]
fn explicit_provider_is_primary() {
    let router = Router::new(RouterConfig::default());
    let intent = ParsedIntent {
        providers: vec!["imf".into()],
        indicators: vec![IndicatorRequest::new("gdp")],
        ..Default::default()
    };
    let chain = chain_names(&router, &intent, &[]);
    assert_eq!(chain[0], "imf");
}

#[test]
fn strong_bindings_precede_index_candidates() {
    let router = Router::new(RouterConfig::default());
    let crypto = ParsedIntent {
        indicators: vec![IndicatorRequest::new("bitcoin price")],
        is_crypto: true,
        ..Default::default()
    };
    assert_eq!(chain_names(&router, &crypto, &[])[0], "coingecko");

    let fx = ParsedIntent {
        indicators: vec![IndicatorRequest::new("EUR/USD")],
        is_exchange_rate: true,
        ..Default::default()
    };
    assert_eq!(chain_names(&router, &fx, &[])[0], "exchangerate");

    let trade = ParsedIntent {
        indicators: vec![IndicatorRequest::new("trade balance")],
        is_trade_query: true,
        ..Default::default()
    };
    assert_eq!(chain_names(&router, &trade, &[])[0], "comtrade");

    let us = ParsedIntent {
        indicators: vec![IndicatorRequest::new("unemployment rate")],
        geography: vec![GeoSelector::Country("USA".into())],
        ..Default::default()
    };
    assert_eq!(chain_names(&router, &us, &[])[0], "fred");

    let canada = ParsedIntent {
        indicators: vec![IndicatorRequest::new("cpi")],
        geography: vec![GeoSelector::Country("CAN".into())],
        ..Default::default()
    };
    assert_eq!(chain_names(&router, &canada, &[])[0], "statcan");
}

#[test]
fn eurostat_is_not_routed_for_non_european_countries() {
    let router = Router::new(RouterConfig::default());
    // The USA has an ISO2 code for Eurostat's bilateral dimensions, but it
    // is not a Eurostat reporting geography; a domestic US query must not
    // route there, not even as a fallback.
    for iso3 in ["USA", "JPN", "BRA"] {
        let intent = ParsedIntent {
            indicators: vec![IndicatorRequest::new("unemployment rate")],
            geography: vec![GeoSelector::Country(iso3.into())],
            ..Default::default()
        };
        let chain = chain_names(&router, &intent, &[]);
        assert!(
            !chain.contains(&"eurostat".to_string()),
            "eurostat routed for {iso3}: {chain:?}"
        );
    }
}

#[test]
fn eurostat_leads_for_european_geographies() {
    let router = Router::new(RouterConfig::default());
    let germany = ParsedIntent {
        indicators: vec![IndicatorRequest::new("unemployment rate")],
        geography: vec![GeoSelector::Country("DEU".into())],
        ..Default::default()
    };
    assert_eq!(chain_names(&router, &germany, &[])[0], "eurostat");

    let euro_area = ParsedIntent {
        indicators: vec![IndicatorRequest::new("inflation")],
        geography: vec![GeoSelector::Group(econo_types::geo::CountryGroup::EuroArea)],
        ..Default::default()
    };
    assert_eq!(chain_names(&router, &euro_area, &[])[0], "eurostat");
}

#[test]
fn index_top_candidate_leads_when_nothing_binds() {
    let router = Router::new(RouterConfig::default());
    let intent = ParsedIntent {
        indicators: vec![IndicatorRequest::new("life expectancy")],
        geography: vec![GeoSelector::World],
        ..Default::default()
    };
    let chain = chain_names(&router, &intent, &[candidate("imf", "LE", 10.0)]);
    assert_eq!(chain[0], "imf");
    // Static global-macro fallback follows.
    assert!(chain.contains(&"worldbank".to_string()));
}

#[test]
fn low_priority_provider_never_enters_as_fallback() {
    let router = Router::new(RouterConfig::default());
    let intent = ParsedIntent {
        indicators: vec![IndicatorRequest::new("gdp")],
        geography: vec![GeoSelector::World],
        ..Default::default()
    };
    let chain = chain_names(&router, &intent, &[]);
    assert!(
        !chain.contains(&LOW_PRIORITY_PROVIDER.to_string()),
        "oecd must not appear without an explicit request: {chain:?}"
    );
}

#[test]
fn low_priority_policy_explicit_only_requires_first_position() {
    let router = Router::new(RouterConfig::default());
    let listed_second = ParsedIntent {
        providers: vec!["worldbank".into(), "oecd".into()],
        indicators: vec![IndicatorRequest::new("gdp")],
        ..Default::default()
    };
    assert!(!chain_names(&router, &listed_second, &[]).contains(&"oecd".to_string()));

    let listed_first = ParsedIntent {
        providers: vec!["oecd".into()],
        indicators: vec![IndicatorRequest::new("gdp")],
        ..Default::default()
    };
    assert_eq!(chain_names(&router, &listed_first, &[])[0], "oecd");
}

#[test]
fn low_priority_policy_when_listed_admits_any_mention() {
    let router = Router::new(RouterConfig {
        low_priority_policy: LowPriorityPolicy::WhenListed,
        ..Default::default()
    });
    let intent = ParsedIntent {
        providers: vec!["worldbank".into(), "oecd".into()],
        indicators: vec![IndicatorRequest::new("gdp")],
        ..Default::default()
    };
    let chain = chain_names(&router, &intent, &[]);
    assert!(chain.contains(&"oecd".to_string()));
    assert_eq!(chain[0], "worldbank");
}

#[test]
fn deny_list_prunes_and_breaker_open_reports_skip() {
    let router = Router::new(RouterConfig {
        deny: vec!["imf".into()],
        ..Default::default()
    });
    let intent = ParsedIntent {
        indicators: vec![IndicatorRequest::new("gdp")],
        geography: vec![GeoSelector::World],
        ..Default::default()
    };

    let all = connectors(&["worldbank", "imf", "eurostat"]);
    let registry = breakers();
    registry.for_provider("worldbank").force_open();

    let routed = router.plan(
        &intent,
        &intent.indicators[0],
        &[],
        &all,
        &registry,
    );
    let names: Vec<_> = routed.chain.iter().map(|c| c.name()).collect();
    assert!(!names.contains(&"imf"), "denied provider in {names:?}");
    assert!(!names.contains(&"worldbank"), "open breaker in {names:?}");
    assert_eq!(routed.skipped, vec!["worldbank".to_string()]);
    assert_eq!(names, vec!["eurostat"]);
}

#[test]
fn allow_list_restricts_to_named_providers() {
    let router = Router::new(RouterConfig {
        allow: vec!["worldbank".into()],
        ..Default::default()
    });
    let intent = ParsedIntent {
        indicators: vec![IndicatorRequest::new("gdp")],
        geography: vec![GeoSelector::World],
        ..Default::default()
    };
    assert_eq!(chain_names(&router, &intent, &[]), vec!["worldbank"]);
}
