//! Mock connector for CI-safe tests and examples. Serves deterministic
//! fixture series, counts calls, and can be scripted to fail or stall.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use econo_core::connector::{
    DataDomain, EconConnector, FetchResponse, IndicatorHit, IndicatorSearchProvider,
    SeriesProvider, SeriesQuery, TradeFlowProvider, TradeQuery,
};
use econo_types::{
    EconError, GeoSelector, NormalizedPoint, NormalizedSeries, SeriesMetadata, TradeFlow,
};

mod fixtures;

pub use fixtures::{annual_series, monthly_series};

/// Scripted behavior for the next calls.
enum Script {
    Succeed,
    Fail(EconError),
    /// Fail `remaining` times, then succeed.
    FailFirst { error: EconError, remaining: AtomicUsize },
    Stall(Duration),
}

/// Mock connector. Deterministic: the same query always yields the same
/// fixture series.
pub struct MockConnector {
    name: &'static str,
    calls: AtomicUsize,
    script: Script,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    /// A well-behaved mock named "mock".
    #[must_use]
    pub fn new() -> Self {
        Self::named("mock")
    }

    /// A well-behaved mock with a custom provider name, for router tests
    /// that need several distinguishable providers.
    #[must_use]
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            calls: AtomicUsize::new(0),
            script: Script::Succeed,
        }
    }

    /// A mock that always fails with `error`.
    #[must_use]
    pub fn failing(name: &'static str, error: EconError) -> Self {
        Self {
            name,
            calls: AtomicUsize::new(0),
            script: Script::Fail(error),
        }
    }

    /// A mock that fails `times` times, then succeeds.
    #[must_use]
    pub fn failing_first(name: &'static str, error: EconError, times: usize) -> Self {
        Self {
            name,
            calls: AtomicUsize::new(0),
            script: Script::FailFirst {
                error,
                remaining: AtomicUsize::new(times),
            },
        }
    }

    /// A mock that sleeps before answering, for timeout tests.
    #[must_use]
    pub fn stalling(name: &'static str, delay: Duration) -> Self {
        Self {
            name,
            calls: AtomicUsize::new(0),
            script: Script::Stall(delay),
        }
    }

    /// Number of fetch calls observed.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn run_script(&self) -> Result<(), EconError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Succeed => Ok(()),
            Script::Fail(e) => Err(e.clone()),
            Script::FailFirst { error, remaining } => {
                let prev = remaining
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .unwrap_or(0);
                if prev > 0 {
                    Err(error.clone())
                } else {
                    Ok(())
                }
            }
            Script::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(())
            }
        }
    }

    fn geo_codes(geo: &GeoSelector) -> Vec<String> {
        match geo {
            GeoSelector::Country(iso3) => vec![iso3.clone()],
            GeoSelector::Group(g) => g.members().iter().map(|m| (*m).to_string()).collect(),
            GeoSelector::World => vec!["WLD".to_string()],
            GeoSelector::Region(r) => vec![r.clone()],
        }
    }
}

impl EconConnector for MockConnector {
    fn name(&self) -> &'static str {
        self.name
    }
    fn vendor(&self) -> &'static str {
        "Mock"
    }
    fn supports(&self, _domain: DataDomain) -> bool {
        true
    }
    fn as_series_provider(&self) -> Option<&dyn SeriesProvider> {
        Some(self as &dyn SeriesProvider)
    }
    fn as_trade_provider(&self) -> Option<&dyn TradeFlowProvider> {
        Some(self as &dyn TradeFlowProvider)
    }
    fn as_search_provider(&self) -> Option<&dyn IndicatorSearchProvider> {
        Some(self as &dyn IndicatorSearchProvider)
    }
}

#[async_trait]
impl SeriesProvider for MockConnector {
    async fn fetch_series(&self, query: &SeriesQuery) -> Result<FetchResponse, EconError> {
        self.run_script().await?;
        let (start, end) = query.range.years().unwrap_or((2019, 2023));
        let code = query
            .indicator
            .explicit_code
            .clone()
            .unwrap_or_else(|| query.indicator.label.to_uppercase().replace(' ', "_"));
        Ok(Self::geo_codes(&query.geo)
            .into_iter()
            .map(|geo| fixtures::annual_series(self.name, &code, &geo, start, end))
            .collect::<Vec<_>>()
            .into())
    }
}

#[async_trait]
impl TradeFlowProvider for MockConnector {
    async fn fetch_trade(&self, query: &TradeQuery) -> Result<NormalizedSeries, EconError> {
        self.run_script().await?;
        let (start, end) = query.range.years().unwrap_or((2019, 2023));
        let reporter = query.reporter.label();
        let partner = query
            .partner
            .as_ref()
            .map_or_else(|| "WLD".to_string(), GeoSelector::label);

        // exports - imports per period, derived from the same fixtures the
        // individual flows would return.
        let value_for = |flow: TradeFlow, year: i32| -> f64 {
            let base = fixtures::deterministic_value(self.name, &query.product, &reporter, year);
            match flow {
                TradeFlow::Exports => base * 1.1,
                TradeFlow::Imports => base,
                TradeFlow::Balance => base * 1.1 - base,
            }
        };

        let points = (start..=end)
            .map(|y| NormalizedPoint::new(y.to_string(), Some(value_for(query.flow, y))))
            .collect();
        Ok(NormalizedSeries {
            metadata: SeriesMetadata {
                source_provider: self.name.to_string(),
                indicator_code: query.product.clone(),
                indicator_display: format!("{:?} of {} ({reporter} vs {partner})", query.flow, query.product),
                country_or_region: reporter,
                unit: "US$".into(),
                frequency: Some(econo_types::Frequency::Annual),
                api_url_echo: format!("mock://{}/trade", self.name),
                source_url: format!("mock://{}", self.name),
                ..SeriesMetadata::default()
            },
            points,
        })
    }
}

#[async_trait]
impl IndicatorSearchProvider for MockConnector {
    async fn search_indicators(
        &self,
        text: &str,
        limit: usize,
    ) -> Result<Vec<IndicatorHit>, EconError> {
        self.run_script().await?;
        Ok(vec![IndicatorHit {
            provider: self.name.to_string(),
            code: text.to_uppercase().replace(' ', "_"),
            name: text.to_string(),
        }]
        .into_iter()
        .take(limit)
        .collect())
    }
}

/// Convenience: an `Arc`-wrapped well-behaved mock.
#[must_use]
pub fn shared() -> Arc<MockConnector> {
    Arc::new(MockConnector::new())
}
