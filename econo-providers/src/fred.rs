//! FRED (Federal Reserve Economic Data) adapter.

use std::sync::Arc;

use async_trait::async_trait;
use econo_core::connector::{
    DataDomain, EconConnector, FetchResponse, IndicatorHit, IndicatorSearchProvider,
    SeriesProvider, SeriesQuery,
};
use econo_core::{HttpClient, HttpResponse};
use econo_index::IndicatorIndex;
use econo_types::{
    scrub_secrets, EconError, GeoSelector, NormalizedPoint, SeriesMetadata,
};
use serde::Deserialize;

use crate::keys;
use crate::rest;

const DEFAULT_BASE: &str = "https://api.stlouisfed.org/fred";

/// The most common terms, kept intentionally small; the indicator index is
/// the primary resolution path.
const ALIASES: &[(&str, &str)] = &[
    ("unemployment rate", "UNRATE"),
    ("unemployment", "UNRATE"),
    ("inflation", "CPIAUCSL"),
    ("cpi", "CPIAUCSL"),
    ("core cpi", "CPILFESL"),
    ("core inflation", "CPILFESL"),
    ("gdp", "GDP"),
    ("real gdp", "GDPC1"),
    ("federal funds rate", "FEDFUNDS"),
    ("fed funds rate", "FEDFUNDS"),
    ("10 year treasury yield", "DGS10"),
    ("mortgage rate", "MORTGAGE30US"),
    ("industrial production", "INDPRO"),
    ("nonfarm payrolls", "PAYEMS"),
    ("retail sales", "RSXFS"),
];

#[derive(Debug, Deserialize)]
struct ObservationsBody {
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct SeriessBody {
    seriess: Vec<SeriesInfo>,
}

#[derive(Debug, Deserialize, Clone)]
struct SeriesInfo {
    id: String,
    title: String,
    #[serde(default)]
    units: String,
    #[serde(default)]
    frequency_short: String,
    #[serde(default)]
    seasonal_adjustment_short: String,
    #[serde(default)]
    last_updated: String,
}

/// FRED connector. US-specific; other geographies yield to the fallback
/// chain.
pub struct FredConnector {
    http: HttpClient,
    base: String,
    api_key: String,
    index: Option<Arc<IndicatorIndex>>,
}

impl FredConnector {
    /// Build against the production base URL; the key is filled by
    /// [`Self::with_api_key`].
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            base: DEFAULT_BASE.to_string(),
            api_key: String::new(),
            index: None,
        }
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Point at a different base URL (tests, proxies).
    #[must_use]
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Attach the indicator index used for label resolution.
    #[must_use]
    pub fn with_index(mut self, index: Arc<IndicatorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    async fn fetch_json(&self, url: &str) -> Result<HttpResponse, EconError> {
        self.http
            .get(keys::FRED, url, &[])
            .await?
            .ensure_success(keys::FRED)
    }

    async fn series_info(&self, code: &str) -> Option<SeriesInfo> {
        let url = rest::build_url(
            &self.base,
            "series",
            &[
                ("series_id", code.to_string()),
                ("api_key", self.api_key.clone()),
                ("file_type", "json".to_string()),
            ],
        );
        let body: SeriessBody = self.fetch_json(&url).await.ok()?.json().ok()?;
        body.seriess.into_iter().next()
    }

    async fn resolve_code(&self, query: &SeriesQuery) -> Result<String, EconError> {
        if let Some(code) =
            rest::resolve_via_tables(keys::FRED, query, ALIASES, self.index.as_deref())?
        {
            return Ok(code);
        }
        // Last resort: the upstream series-search endpoint.
        let hits = self.search_indicators(&query.indicator.label, 1).await?;
        hits.into_iter().map(|h| h.code).next().ok_or_else(|| {
            rest::unknown_indicator(&query.indicator.label, self.index.as_deref(), keys::FRED)
        })
    }

    /// Collapse full ISO dates to the label shape of the native cadence.
    fn period_label(date: &str, frequency_short: &str) -> String {
        match frequency_short {
            "A" => date.get(..4).unwrap_or(date).to_string(),
            "Q" => {
                let year = date.get(..4).unwrap_or(date);
                let month: u8 = date.get(5..7).and_then(|m| m.parse().ok()).unwrap_or(1);
                format!("{year}-Q{}", (month - 1) / 3 + 1)
            }
            "M" => date.get(..7).unwrap_or(date).to_string(),
            _ => date.to_string(),
        }
    }
}

impl EconConnector for FredConnector {
    fn name(&self) -> &'static str {
        keys::FRED
    }
    fn vendor(&self) -> &'static str {
        "Federal Reserve Bank of St. Louis"
    }
    fn supports(&self, domain: DataDomain) -> bool {
        matches!(domain, DataDomain::UsMacro | DataDomain::GlobalMacro)
    }
    fn as_series_provider(&self) -> Option<&dyn SeriesProvider> {
        Some(self as &dyn SeriesProvider)
    }
    fn as_search_provider(&self) -> Option<&dyn IndicatorSearchProvider> {
        Some(self as &dyn IndicatorSearchProvider)
    }
}

#[async_trait]
impl SeriesProvider for FredConnector {
    async fn fetch_series(&self, query: &SeriesQuery) -> Result<FetchResponse, EconError> {
        match &query.geo {
            GeoSelector::Country(iso3) if iso3 == "USA" => {}
            other => {
                return Err(EconError::DataNotAvailable {
                    what: format!("FRED covers the United States, not {}", other.label()),
                    hint: Some("route to worldbank or imf".into()),
                })
            }
        }

        let code = self.resolve_code(query).await?;
        let mut params = vec![
            ("series_id", code.clone()),
            ("api_key", self.api_key.clone()),
            ("file_type", "json".to_string()),
        ];
        if let Some(start) = &query.range.start {
            params.push(("observation_start", start.clone()));
        }
        if let Some(end) = &query.range.end {
            params.push(("observation_end", end.clone()));
        }
        let url = rest::build_url(&self.base, "series/observations", &params);
        let body: ObservationsBody = self.fetch_json(&url).await?.json()?;

        let info = self.series_info(&code).await;
        let frequency_short = info
            .as_ref()
            .map(|i| i.frequency_short.clone())
            .unwrap_or_default();

        let points: Vec<NormalizedPoint> = body
            .observations
            .into_iter()
            .map(|o| {
                // FRED encodes missing observations as ".".
                let value = o.value.parse::<f64>().ok();
                NormalizedPoint::new(Self::period_label(&o.date, &frequency_short), value)
            })
            .collect();
        rest::require_points(&points, &format!("{code} observations"))?;

        let metadata = SeriesMetadata {
            source_provider: keys::FRED.to_string(),
            indicator_code: code.clone(),
            indicator_display: info
                .as_ref()
                .map_or_else(|| query.indicator.label.clone(), |i| i.title.clone()),
            country_or_region: "USA".to_string(),
            unit: info.as_ref().map(|i| i.units.clone()).unwrap_or_default(),
            frequency: None,
            last_updated: info
                .as_ref()
                .filter(|i| !i.last_updated.is_empty())
                .map(|i| i.last_updated.clone()),
            api_url_echo: scrub_secrets(&url),
            source_url: format!("https://fred.stlouisfed.org/series/{code}"),
            seasonal_adjustment: info
                .as_ref()
                .filter(|i| !i.seasonal_adjustment_short.is_empty())
                .map(|i| i.seasonal_adjustment_short.clone()),
            price_type: None,
            aggregation: None,
        };

        let (series, had_duplicates) = rest::finalize_series(
            metadata,
            points,
            query.frequency,
            &query.indicator.qualifiers,
        )?;
        let mut resp = FetchResponse::new(vec![series]);
        if had_duplicates {
            resp = resp.with_warning(rest::duplicate_dates_warning(keys::FRED, &code));
        }
        Ok(resp)
    }
}

#[async_trait]
impl IndicatorSearchProvider for FredConnector {
    async fn search_indicators(
        &self,
        text: &str,
        limit: usize,
    ) -> Result<Vec<IndicatorHit>, EconError> {
        let url = rest::build_url(
            &self.base,
            "series/search",
            &[
                ("search_text", text.to_string()),
                ("api_key", self.api_key.clone()),
                ("file_type", "json".to_string()),
                ("limit", limit.to_string()),
            ],
        );
        let body: SeriessBody = self.fetch_json(&url).await?.json()?;
        Ok(body
            .seriess
            .into_iter()
            .map(|s| IndicatorHit {
                provider: keys::FRED.to_string(),
                code: s.id,
                name: s.title,
            })
            .collect())
    }
}
