//! BIS statistics adapter (SDMX-JSON data API).

use async_trait::async_trait;
use econo_core::connector::{DataDomain, EconConnector, FetchResponse, SeriesProvider, SeriesQuery};
use econo_core::HttpClient;
use econo_sdmx::{DataSet, Dsd};
use econo_types::{EconError, GeoSelector};
use serde_json::Value;

use crate::keys;
use crate::rest;
use crate::sdmx_common::{cross_section_to_series, SDMX_JSON_ACCEPT};

const DEFAULT_BASE: &str = "https://stats.bis.org/api/v2";

/// Label -> `(dataflow, key template)`; `{geo}` is replaced by the ISO2
/// area code. BIS dataflows are few and stable, so a table beats a catalog.
const FLOWS: &[(&str, &str, &str)] = &[
    ("policy rate", "WS_CBPOL_M", "M.{geo}"),
    ("central bank policy rate", "WS_CBPOL_M", "M.{geo}"),
    ("interest rate", "WS_CBPOL_M", "M.{geo}"),
    ("property prices", "WS_SPP", "Q.{geo}.N.628"),
    ("house prices", "WS_SPP", "Q.{geo}.N.628"),
    ("credit to gdp", "WS_TC", "Q.{geo}.P.A.M.770.A"),
    ("credit", "WS_TC", "Q.{geo}.P.A.M.770.A"),
    ("effective exchange rate", "WS_EER_M", "M.R.B.{geo}"),
];

/// BIS connector. Banking and financial-stability statistics.
pub struct BisConnector {
    http: HttpClient,
    base: String,
}

impl BisConnector {
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

    /// BIS keys use two-letter area codes (`US`, `XM` for the euro area).
    fn area_code(geo: &GeoSelector) -> Result<String, EconError> {
        match geo {
            GeoSelector::Country(iso3) => econo_types::geo::iso2_for_iso3(iso3)
                .map(str::to_string)
                .or_else(|| iso3.get(..2).map(str::to_string))
                .ok_or_else(|| EconError::InvalidArg(format!("bad area {iso3}"))),
            GeoSelector::Group(g) if g.tag() == "EURO_AREA" => Ok("XM".to_string()),
            other => Err(EconError::DataNotAvailable {
                what: format!("BIS area for {}", other.label()),
                hint: Some("BIS series are per-country".into()),
            }),
        }
    }
}

impl EconConnector for BisConnector {
    fn name(&self) -> &'static str {
        keys::BIS
    }
    fn vendor(&self) -> &'static str {
        "Bank for International Settlements"
    }
    fn supports(&self, domain: DataDomain) -> bool {
        matches!(domain, DataDomain::Financial)
    }
    fn as_series_provider(&self) -> Option<&dyn SeriesProvider> {
        Some(self as &dyn SeriesProvider)
    }
}

#[async_trait]
impl SeriesProvider for BisConnector {
    async fn fetch_series(&self, query: &SeriesQuery) -> Result<FetchResponse, EconError> {
        let label = query.indicator.label.to_lowercase();
        let (flow, key_template) = FLOWS
            .iter()
            .find(|(alias, _, _)| label.contains(alias))
            .map(|(_, flow, key)| (*flow, *key))
            .ok_or_else(|| EconError::IndicatorUnknown {
                label: query.indicator.label.clone(),
                suggestions: FLOWS.iter().map(|(a, _, _)| (*a).to_string()).collect(),
            })?;

        let area = Self::area_code(&query.geo)?;
        let key = key_template.replace("{geo}", &area);
        let mut params = vec![("format", "json".to_string())];
        if let Some((start, end)) = query.range.years() {
            params.push(("startPeriod", start.to_string()));
            params.push(("endPeriod", end.to_string()));
        }
        let url = rest::build_url(
            &self.base,
            &format!("data/dataflow/BIS/{flow}/1.0/{key}"),
            &params,
        );
        let body: Value = self
            .http
            .get(keys::BIS, &url, &[SDMX_JSON_ACCEPT])
            .await?
            .ensure_success(keys::BIS)?
            .json()?;

        let dsd = Dsd::parse(&body).map_err(|e| EconError::Data(format!("bis structure: {e}")))?;
        let dataset =
            DataSet::parse(&body).map_err(|e| EconError::Data(format!("bis dataset: {e}")))?;
        let sections = dataset
            .cross_sections(&dsd, &[])
            .map_err(|e| EconError::Data(format!("bis decode: {e}")))?;
        if sections.is_empty() {
            return Err(EconError::data_not_available(format!(
                "{flow} for {area}"
            )));
        }

        let mut out = Vec::new();
        for section in &sections {
            out.push(cross_section_to_series(
                keys::BIS,
                flow,
                section,
                &query.indicator.label,
                url.clone(),
                format!("https://data.bis.org/topics/{flow}"),
            )?);
        }
        Ok(out.into())
    }
}
