//! World Bank open-data adapter.
//!
//! Multi-country requests use the provider's native semicolon-separated
//! country list up to [`COUNTRY_CHUNK`]; beyond that the adapter chunks and
//! concatenates.

use std::sync::Arc;

use async_trait::async_trait;
use econo_core::connector::{DataDomain, EconConnector, FetchResponse, SeriesProvider, SeriesQuery};
use econo_core::HttpClient;
use econo_index::IndicatorIndex;
use econo_types::geo::display_name_for_iso3;
use econo_types::{
    EconError, GeoSelector, NormalizedPoint, Qualifier, SeriesMetadata,
};
use serde_json::Value;

use crate::keys;
use crate::rest;

const DEFAULT_BASE: &str = "https://api.worldbank.org/v2";

/// Documented-safe bound on countries per call.
const COUNTRY_CHUNK: usize = 60;

const ALIASES: &[(&str, &str)] = &[
    ("gdp", "NY.GDP.MKTP.CD"),
    ("gdp growth", "NY.GDP.MKTP.KD.ZG"),
    ("gdp per capita", "NY.GDP.PCAP.CD"),
    ("real gdp", "NY.GDP.MKTP.KD"),
    ("inflation", "FP.CPI.TOTL.ZG"),
    ("unemployment", "SL.UEM.TOTL.ZS"),
    ("unemployment rate", "SL.UEM.TOTL.ZS"),
    ("population", "SP.POP.TOTL"),
    ("exports", "NE.EXP.GNFS.ZS"),
    ("imports", "NE.IMP.GNFS.ZS"),
    ("current account balance", "BN.CAB.XOKA.GD.ZS"),
    ("government debt", "GC.DOD.TOTL.GD.ZS"),
    ("life expectancy", "SP.DYN.LE00.IN"),
];

/// World Bank connector.
pub struct WorldBankConnector {
    http: HttpClient,
    base: String,
    index: Option<Arc<IndicatorIndex>>,
}

impl WorldBankConnector {
    /// Build against the production base URL. No API key required.
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

    /// Attach the indicator index used for label resolution.
    #[must_use]
    pub fn with_index(mut self, index: Arc<IndicatorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    fn qualify_code(code: &str, qualifiers: &[Qualifier]) -> String {
        // The most common real/growth disambiguation for headline GDP.
        if code == "NY.GDP.MKTP.CD" {
            if qualifiers.contains(&Qualifier::Growth) {
                return "NY.GDP.MKTP.KD.ZG".to_string();
            }
            if qualifiers.contains(&Qualifier::Real) {
                return "NY.GDP.MKTP.KD".to_string();
            }
            if qualifiers.contains(&Qualifier::PerCapita) {
                return "NY.GDP.PCAP.CD".to_string();
            }
        }
        code.to_string()
    }

    fn geo_iso3_list(geo: &GeoSelector) -> Vec<String> {
        match geo {
            GeoSelector::Country(iso3) => vec![iso3.clone()],
            GeoSelector::Group(group) => group.members().iter().map(|m| (*m).to_string()).collect(),
            GeoSelector::World => vec!["WLD".to_string()],
            GeoSelector::Region(r) => vec![r.clone()],
        }
    }

    /// One chunked call; returns `(iso3, date, value)` rows.
    async fn fetch_rows(
        &self,
        countries: &[String],
        code: &str,
        date_param: Option<&str>,
    ) -> Result<(Vec<(String, String, Option<f64>)>, String, String), EconError> {
        let joined = countries.join(";");
        let mut params = vec![
            ("format", "json".to_string()),
            ("per_page", "20000".to_string()),
        ];
        if let Some(date) = date_param {
            params.push(("date", date.to_string()));
        }
        let url = rest::build_url(
            &self.base,
            &format!("country/{joined}/indicator/{code}"),
            &params,
        );
        let body: Value = self
            .http
            .get(keys::WORLDBANK, &url, &[])
            .await?
            .ensure_success(keys::WORLDBANK)?
            .json()?;

        // Response shape: [pagination, rows]; an error shape carries a
        // "message" array in the first element instead.
        let rows = match body.as_array() {
            Some(arr) if arr.len() >= 2 => arr[1].as_array().cloned().unwrap_or_default(),
            Some(arr) => {
                if let Some(msg) = arr
                    .first()
                    .and_then(|v| v.pointer("/message/0/value"))
                    .and_then(Value::as_str)
                {
                    return Err(EconError::provider(keys::WORLDBANK, msg.to_string()));
                }
                Vec::new()
            }
            None => {
                return Err(EconError::Data("world bank body is not an array".into()));
            }
        };

        let mut out = Vec::with_capacity(rows.len());
        let mut indicator_name = String::new();
        let mut unit = String::new();
        for row in rows {
            let iso3 = row
                .get("countryiso3code")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let date = row
                .get("date")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let value = row.get("value").and_then(Value::as_f64);
            if indicator_name.is_empty() {
                if let Some(name) = row.pointer("/indicator/value").and_then(Value::as_str) {
                    indicator_name = name.to_string();
                }
            }
            if unit.is_empty() {
                if let Some(u) = row.get("unit").and_then(Value::as_str) {
                    unit = u.to_string();
                }
            }
            if !iso3.is_empty() && !date.is_empty() {
                out.push((iso3, normalize_wb_date(&date), value));
            }
        }
        Ok((out, indicator_name, unit))
    }
}

/// World Bank date labels: `2022`, `2022Q1`, `2022M01`.
fn normalize_wb_date(date: &str) -> String {
    if let Some(idx) = date.find(['Q', 'M']) {
        let (year, rest) = date.split_at(idx);
        match rest.get(..1) {
            Some("Q") => format!("{year}-{rest}"),
            Some("M") => format!("{year}-{}", &rest[1..]),
            _ => date.to_string(),
        }
    } else {
        date.to_string()
    }
}

impl EconConnector for WorldBankConnector {
    fn name(&self) -> &'static str {
        keys::WORLDBANK
    }
    fn vendor(&self) -> &'static str {
        "World Bank"
    }
    fn supports(&self, domain: DataDomain) -> bool {
        matches!(domain, DataDomain::GlobalMacro | DataDomain::UsMacro)
    }
    fn as_series_provider(&self) -> Option<&dyn SeriesProvider> {
        Some(self as &dyn SeriesProvider)
    }
}

#[async_trait]
impl SeriesProvider for WorldBankConnector {
    async fn fetch_series(&self, query: &SeriesQuery) -> Result<FetchResponse, EconError> {
        let code = rest::resolve_via_tables(keys::WORLDBANK, query, ALIASES, self.index.as_deref())?
            .ok_or_else(|| {
                rest::unknown_indicator(
                    &query.indicator.label,
                    self.index.as_deref(),
                    keys::WORLDBANK,
                )
            })?;
        let code = Self::qualify_code(&code, &query.indicator.qualifiers);

        let countries = Self::geo_iso3_list(&query.geo);
        let date_param = query.range.years().map(|(s, e)| format!("{s}:{e}"));

        let mut rows = Vec::new();
        let mut indicator_name = String::new();
        let mut unit = String::new();
        for chunk in countries.chunks(COUNTRY_CHUNK) {
            let (chunk_rows, name, chunk_unit) =
                self.fetch_rows(chunk, &code, date_param.as_deref()).await?;
            if indicator_name.is_empty() {
                indicator_name = name;
            }
            if unit.is_empty() {
                unit = chunk_unit;
            }
            rows.extend(chunk_rows);
        }

        // Preserve the caller's country order in the output.
        let mut out = Vec::new();
        let mut warnings = Vec::new();
        for iso3 in &countries {
            let points: Vec<NormalizedPoint> = rows
                .iter()
                .filter(|(c, _, _)| c == iso3)
                .map(|(_, date, value)| NormalizedPoint::new(date.clone(), *value))
                .collect();
            if points.is_empty() {
                continue;
            }
            let display_unit = if unit.is_empty() && code.ends_with(".CD") {
                "current US$".to_string()
            } else if unit.is_empty() && code.ends_with(".ZG") {
                "percent".to_string()
            } else {
                unit.clone()
            };
            let metadata = SeriesMetadata {
                source_provider: keys::WORLDBANK.to_string(),
                indicator_code: code.clone(),
                indicator_display: if indicator_name.is_empty() {
                    query.indicator.label.clone()
                } else {
                    indicator_name.clone()
                },
                country_or_region: display_name_for_iso3(iso3).unwrap_or_else(|| iso3.clone()),
                unit: display_unit,
                api_url_echo: rest::build_url(
                    &self.base,
                    &format!("country/{iso3}/indicator/{code}"),
                    &[("format", "json".to_string())],
                ),
                source_url: format!("https://data.worldbank.org/indicator/{code}"),
                ..SeriesMetadata::default()
            };
            let (series, had_duplicates) = rest::finalize_series(
                metadata,
                points,
                query.frequency,
                &query.indicator.qualifiers,
            )?;
            if had_duplicates {
                warnings.push(rest::duplicate_dates_warning(keys::WORLDBANK, &code));
            }
            out.push(series);
        }

        if out.is_empty() {
            return Err(EconError::data_not_available(format!(
                "{code} for {}",
                query.geo.label()
            )));
        }
        Ok(FetchResponse {
            series: out,
            warnings,
        })
    }
}
