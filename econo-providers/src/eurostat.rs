//! Eurostat adapter (JSON-stat 2.0 dissemination API).

use std::sync::Arc;

use async_trait::async_trait;
use econo_core::connector::{DataDomain, EconConnector, FetchResponse, SeriesProvider, SeriesQuery};
use econo_core::HttpClient;
use econo_index::IndicatorIndex;
use econo_sdmx::JsonStat;
use econo_types::geo::iso2_for_iso3;
use econo_types::{EconError, GeoSelector, Qualifier};
use serde_json::Value;

use crate::keys;
use crate::rest;
use crate::sdmx_common::cross_section_to_series;

const DEFAULT_BASE: &str =
    "https://ec.europa.eu/eurostat/api/dissemination/statistics/1.0/data";

const ALIASES: &[(&str, &str)] = &[
    ("unemployment rate", "une_rt_a"),
    ("unemployment", "une_rt_a"),
    ("gdp", "nama_10_gdp"),
    ("inflation", "prc_hicp_aind"),
    ("hicp", "prc_hicp_aind"),
    ("government debt", "gov_10dd_edpt1"),
    ("population", "demo_pjan"),
];

/// Eurostat connector. Dataset codes resolve via aliases then the
/// indicator index; responses decode through the JSON-stat cube reader.
pub struct EurostatConnector {
    http: HttpClient,
    base: String,
    index: Option<Arc<IndicatorIndex>>,
}

impl EurostatConnector {
    /// Build against the production dissemination API.
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            base: DEFAULT_BASE.to_string(),
            index: None,
        }
    }

    /// Point at a different base URL (tests, proxies).
    #[must_use]
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Attach the indicator index used for dataset resolution.
    #[must_use]
    pub fn with_index(mut self, index: Arc<IndicatorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    fn geo_param(geo: &GeoSelector) -> Result<Vec<String>, EconError> {
        match geo {
            GeoSelector::Country(iso3) => {
                let iso2 = iso2_for_iso3(iso3).ok_or_else(|| {
                    EconError::DataNotAvailable {
                        what: format!("Eurostat coverage for {iso3}"),
                        hint: Some("route to worldbank or oecd".into()),
                    }
                })?;
                Ok(vec![iso2.to_string()])
            }
            GeoSelector::Group(group) => Ok(group
                .members()
                .iter()
                .filter_map(|iso3| iso2_for_iso3(iso3))
                .map(str::to_string)
                .collect()),
            GeoSelector::World => Err(EconError::DataNotAvailable {
                what: "Eurostat world aggregate".into(),
                hint: Some("route to worldbank or imf".into()),
            }),
            GeoSelector::Region(r) => Ok(vec![r.clone()]),
        }
    }
}

impl EconConnector for EurostatConnector {
    fn name(&self) -> &'static str {
        keys::EUROSTAT
    }
    fn vendor(&self) -> &'static str {
        "Eurostat"
    }
    fn supports(&self, domain: DataDomain) -> bool {
        matches!(domain, DataDomain::EuroMacro | DataDomain::GlobalMacro)
    }
    fn as_series_provider(&self) -> Option<&dyn SeriesProvider> {
        Some(self as &dyn SeriesProvider)
    }
}

#[async_trait]
impl SeriesProvider for EurostatConnector {
    async fn fetch_series(&self, query: &SeriesQuery) -> Result<FetchResponse, EconError> {
        let dataset =
            rest::resolve_via_tables(keys::EUROSTAT, query, ALIASES, self.index.as_deref())?
                .ok_or_else(|| {
                    rest::unknown_indicator(
                        &query.indicator.label,
                        self.index.as_deref(),
                        keys::EUROSTAT,
                    )
                })?;

        let geos = Self::geo_param(&query.geo)?;
        let mut params: Vec<(&str, String)> = vec![("format", "JSON".to_string())];
        for geo in &geos {
            params.push(("geo", geo.clone()));
        }
        if let Some((start, end)) = query.range.years() {
            params.push(("sinceTimePeriod", start.to_string()));
            params.push(("untilTimePeriod", end.to_string()));
        }
        let url = rest::build_url(&self.base, &dataset, &params);
        let body: Value = self
            .http
            .get(keys::EUROSTAT, &url, &[])
            .await?
            .ensure_success(keys::EUROSTAT)?
            .json()?;

        let stat = JsonStat::parse(&body)
            .map_err(|e| EconError::Data(format!("eurostat json-stat: {e}")))?;

        // Constrain the unit axis when the cube mixes rates with counts:
        // a rate query must come back as "percent of active population",
        // not thousand persons.
        let mut constraints: Vec<(&str, &str)> = Vec::new();
        let unit_codes = stat.codes("unit").map(<[econo_sdmx::CodeValue]>::to_vec);
        let preferred_unit = unit_codes.as_ref().and_then(|codes| {
            if codes.len() <= 1 {
                return None;
            }
            let prefer: &[&str] = if query.indicator.qualifiers.contains(&Qualifier::PerCapita) {
                &["per capita", "per inhabitant"]
            } else {
                &["percent", "percentage", "rate"]
            };
            codes
                .iter()
                .find(|c| {
                    let name = c.name.to_lowercase();
                    prefer.iter().any(|p| name.contains(p)) || c.id.starts_with("PC")
                })
                .map(|c| c.id.clone())
        });
        if let Some(unit) = preferred_unit.as_deref() {
            constraints.push(("unit", unit));
        }
        let wants_sa = query
            .indicator
            .qualifiers
            .contains(&Qualifier::SeasonallyAdjusted);
        let sa_code = stat.codes("s_adj").and_then(|codes| {
            codes
                .iter()
                .find(|c| c.id == if wants_sa { "SA" } else { "NSA" })
                .map(|c| c.id.clone())
        });
        if let Some(sa) = sa_code.as_deref() {
            constraints.push(("s_adj", sa));
        }

        let sections = stat
            .cross_sections("time", &constraints)
            .map_err(|e| EconError::Data(format!("eurostat decode: {e}")))?;

        // Keep one section per requested geo, preserving caller order.
        let mut out = Vec::new();
        for geo in &geos {
            let Some(section) = sections
                .iter()
                .find(|s| s.code("geo").is_some_and(|c| &c.id == geo))
            else {
                continue;
            };
            out.push(cross_section_to_series(
                keys::EUROSTAT,
                &dataset,
                section,
                &query.indicator.label,
                url.clone(),
                format!("https://ec.europa.eu/eurostat/databrowser/view/{dataset}/default/table"),
            )?);
        }

        if out.is_empty() {
            return Err(EconError::data_not_available(format!(
                "{dataset} for {}",
                query.geo.label()
            )));
        }
        Ok(out.into())
    }
}
