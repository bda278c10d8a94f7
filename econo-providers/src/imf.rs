//! IMF datamapper adapter (WEO aggregates by indicator/ISO3).

use async_trait::async_trait;
use econo_core::connector::{
    DataDomain, EconConnector, FetchResponse, IndicatorHit, IndicatorSearchProvider,
    SeriesProvider, SeriesQuery,
};
use econo_core::HttpClient;
use econo_types::geo::display_name_for_iso3;
use econo_types::{EconError, GeoSelector, NormalizedPoint, SeriesMetadata};
use serde_json::Value;

use crate::keys;
use crate::rest;

const DEFAULT_BASE: &str = "https://www.imf.org/external/datamapper/api/v1";

const ALIASES: &[(&str, &str)] = &[
    ("gdp", "NGDPD"),
    ("gdp growth", "NGDP_RPCH"),
    ("real gdp growth", "NGDP_RPCH"),
    ("gdp per capita", "NGDPDPC"),
    ("inflation", "PCPIPCH"),
    ("unemployment", "LUR"),
    ("unemployment rate", "LUR"),
    ("government debt", "GGXWDG_NGDP"),
    ("current account balance", "BCA_NGDPD"),
];

/// IMF datamapper connector. Annual WEO-style aggregates; no API key.
pub struct ImfConnector {
    http: HttpClient,
    base: String,
}

impl ImfConnector {
    /// Build against the production base URL.
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            base: DEFAULT_BASE.to_string(),
        }
    }

    /// Point at a different base URL (tests, proxies).
    #[must_use]
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    fn geo_codes(geo: &GeoSelector) -> Vec<String> {
        match geo {
            GeoSelector::Country(iso3) => vec![iso3.clone()],
            GeoSelector::Group(g) => g.members().iter().map(|m| (*m).to_string()).collect(),
            // The datamapper serves world and named aggregates by group code.
            GeoSelector::World => vec!["WEOWORLD".to_string()],
            GeoSelector::Region(r) => vec![r.clone()],
        }
    }
}

impl EconConnector for ImfConnector {
    fn name(&self) -> &'static str {
        keys::IMF
    }
    fn vendor(&self) -> &'static str {
        "International Monetary Fund"
    }
    fn supports(&self, domain: DataDomain) -> bool {
        matches!(domain, DataDomain::GlobalMacro)
    }
    fn as_series_provider(&self) -> Option<&dyn SeriesProvider> {
        Some(self as &dyn SeriesProvider)
    }
    fn as_search_provider(&self) -> Option<&dyn IndicatorSearchProvider> {
        Some(self as &dyn IndicatorSearchProvider)
    }
}

#[async_trait]
impl SeriesProvider for ImfConnector {
    async fn fetch_series(&self, query: &SeriesQuery) -> Result<FetchResponse, EconError> {
        let code = rest::resolve_via_tables(keys::IMF, query, ALIASES, None)?
            .ok_or_else(|| rest::unknown_indicator(&query.indicator.label, None, keys::IMF))?;

        let geos = Self::geo_codes(&query.geo);
        let url = rest::build_url(
            &self.base,
            &format!("{}/{}", code, geos.join("/")),
            &[],
        );
        let body: Value = self
            .http
            .get(keys::IMF, &url, &[])
            .await?
            .ensure_success(keys::IMF)?
            .json()?;

        let per_geo = body
            .pointer(&format!("/values/{code}"))
            .and_then(Value::as_object)
            .ok_or_else(|| EconError::data_not_available(format!("{code} from datamapper")))?;

        let years = query.range.years();
        let mut out = Vec::new();
        for geo in &geos {
            let Some(observations) = per_geo.get(geo).and_then(Value::as_object) else {
                continue;
            };
            let points: Vec<NormalizedPoint> = observations
                .iter()
                .filter(|(year, _)| {
                    years.is_none_or(|(s, e)| {
                        year.parse::<i32>().map(|y| y >= s && y <= e).unwrap_or(false)
                    })
                })
                .map(|(year, v)| NormalizedPoint::new(year.clone(), v.as_f64()))
                .collect();
            if points.is_empty() {
                continue;
            }
            let metadata = SeriesMetadata {
                source_provider: keys::IMF.to_string(),
                indicator_code: code.clone(),
                indicator_display: query.indicator.label.clone(),
                country_or_region: display_name_for_iso3(geo).unwrap_or_else(|| geo.clone()),
                unit: if code.ends_with("PCH") || code.contains("NGDP_R") {
                    "percent".to_string()
                } else {
                    String::new()
                },
                api_url_echo: url.clone(),
                source_url: format!("https://www.imf.org/external/datamapper/{code}"),
                ..SeriesMetadata::default()
            };
            let (series, _) = rest::finalize_series(
                metadata,
                points,
                query.frequency,
                &query.indicator.qualifiers,
            )?;
            out.push(series);
        }

        if out.is_empty() {
            return Err(EconError::data_not_available(format!(
                "{code} for {}",
                query.geo.label()
            )));
        }
        Ok(out.into())
    }
}

#[async_trait]
impl IndicatorSearchProvider for ImfConnector {
    async fn search_indicators(
        &self,
        text: &str,
        limit: usize,
    ) -> Result<Vec<IndicatorHit>, EconError> {
        let url = rest::build_url(&self.base, "indicators", &[]);
        let body: Value = self
            .http
            .get(keys::IMF, &url, &[])
            .await?
            .ensure_success(keys::IMF)?
            .json()?;
        let needle = text.to_lowercase();
        let mut hits = Vec::new();
        if let Some(map) = body.get("indicators").and_then(Value::as_object) {
            for (code, meta) in map {
                let label = meta
                    .get("label")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if label.to_lowercase().contains(&needle) {
                    hits.push(IndicatorHit {
                        provider: keys::IMF.to_string(),
                        code: code.clone(),
                        name: label.to_string(),
                    });
                    if hits.len() >= limit {
                        break;
                    }
                }
            }
        }
        Ok(hits)
    }
}
