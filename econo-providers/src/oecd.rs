//! OECD SDMX adapter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use econo_core::connector::{DataDomain, EconConnector, FetchResponse, SeriesProvider, SeriesQuery};
use econo_core::HttpClient;
use econo_index::IndicatorIndex;
use econo_sdmx::{DataSet, DataflowRef, DimensionKey, Dsd};
use econo_types::{EconError, GeoSelector, Qualifier};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::info;

use crate::keys;
use crate::sdmx_common::{
    cross_section_to_series, dsd_for, infer_agency, DataflowCatalog, DsdCache, SDMX_JSON_ACCEPT,
};

const DEFAULT_BASE: &str = "https://sdmx.oecd.org/public/rest";

const ALIASES: &[(&str, &str)] = &[
    ("unemployment rate", "DSD_LFS@DF_IALFS_UNE_M"),
    ("unemployment", "DSD_LFS@DF_IALFS_UNE_M"),
    ("gdp", "QNA"),
    ("gdp growth", "QNA"),
    ("inflation", "PRICES_CPI"),
    ("cpi", "PRICES_CPI"),
];

/// OECD connector. The dataflow catalog (~1,400 entries) loads once at
/// process start; the DSD cache holds Data Structure Definitions for a
/// long TTL.
pub struct OecdConnector {
    http: HttpClient,
    base: String,
    index: Option<Arc<IndicatorIndex>>,
    catalog: RwLock<DataflowCatalog>,
    dsds: DsdCache,
}

impl OecdConnector {
    /// Build against the production base URL.
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            base: DEFAULT_BASE.to_string(),
            index: None,
            catalog: RwLock::new(DataflowCatalog::default()),
            dsds: DsdCache::new(Duration::from_secs(24 * 3600)),
        }
    }

    /// Point at a different base URL (tests, proxies).
    #[must_use]
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Attach the indicator index used for dataflow resolution.
    #[must_use]
    pub fn with_index(mut self, index: Arc<IndicatorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Load the dataflow catalog. Called once at startup; a failure leaves
    /// the catalog empty and resolution falls back to aliases and the
    /// indicator index.
    pub async fn load_catalog(&self) -> Result<usize, EconError> {
        let url = format!("{}/dataflow/all?format=sdmx-json", self.base);
        let body: Value = self
            .http
            .get(keys::OECD, &url, &[SDMX_JSON_ACCEPT])
            .await?
            .ensure_success(keys::OECD)?
            .json()?;
        let catalog = DataflowCatalog::from_message(&body);
        let count = catalog.len();
        *self.catalog.write() = catalog;
        info!(target = "econo::oecd", dataflows = count, "dataflow catalog loaded");
        Ok(count)
    }

    fn resolve_dataflow(&self, query: &SeriesQuery) -> Result<DataflowRef, EconError> {
        let label = query.indicator.label.to_lowercase();
        let id = if let Some(code) = &query.indicator.explicit_code {
            code.clone()
        } else if let Some((_, id)) = ALIASES.iter().find(|(alias, _)| *alias == label.trim()) {
            (*id).to_string()
        } else {
            let catalog = self.catalog.read();
            if let Some(entry) = catalog.search(&query.indicator.label, 1).first() {
                return Ok(entry.flow.clone());
            }
            drop(catalog);
            let from_index = self
                .index
                .as_deref()
                .and_then(|i| i.search(&query.indicator.label, Some(keys::OECD), 1).ok())
                .and_then(|hits| hits.into_iter().next())
                .map(|hit| hit.record.code);
            from_index.ok_or_else(|| EconError::IndicatorUnknown {
                label: query.indicator.label.clone(),
                suggestions: Vec::new(),
            })?
        };
        Ok(DataflowRef::new(infer_agency(&id), id, "+"))
    }

    /// Growth intents filter on the TRANSFORMATION dimension when the
    /// dataset declares a growth code.
    fn growth_code(dsd: &Dsd) -> Option<(String, String)> {
        for dim_id in ["TRANSFORMATION", "TRANSACTION", "MEASURE"] {
            if let Some(dim) = dsd.dimension(dim_id) {
                if let Some(code) = dim
                    .values
                    .iter()
                    .find(|c| c.name.to_lowercase().contains("growth"))
                {
                    return Some((dim_id.to_string(), code.id.clone()));
                }
            }
        }
        None
    }

    fn unit_preference(qualifiers: &[Qualifier]) -> &'static [&'static str] {
        if qualifiers.contains(&Qualifier::PerCapita) {
            &["per capita", "per head"]
        } else {
            // Rates and shares beat level counts when the cube mixes them.
            &["percent", "percentage", "rate"]
        }
    }
}

impl EconConnector for OecdConnector {
    fn name(&self) -> &'static str {
        keys::OECD
    }
    fn vendor(&self) -> &'static str {
        "OECD"
    }
    fn supports(&self, domain: DataDomain) -> bool {
        matches!(domain, DataDomain::GlobalMacro | DataDomain::EuroMacro)
    }
    fn as_series_provider(&self) -> Option<&dyn SeriesProvider> {
        Some(self as &dyn SeriesProvider)
    }
}

#[async_trait]
impl SeriesProvider for OecdConnector {
    async fn fetch_series(&self, query: &SeriesQuery) -> Result<FetchResponse, EconError> {
        let flow = self.resolve_dataflow(query)?;
        let dsd = dsd_for(&self.dsds, &self.http, keys::OECD, &self.base, &flow).await?;

        let mut key = DimensionKey::for_dsd(&dsd);
        match &query.geo {
            GeoSelector::Country(iso3) => key.set_if_present("REF_AREA", iso3.clone()),
            GeoSelector::Group(_) | GeoSelector::World | GeoSelector::Region(_) => {}
        }
        if let Some(freq) = query.frequency {
            key.set_if_present("FREQ", freq.code());
        }
        let wants_growth = query.indicator.qualifiers.contains(&Qualifier::Growth);
        if wants_growth {
            match Self::growth_code(&dsd) {
                Some((dim, code)) => key.set_if_present(&dim, code),
                None => {
                    return Err(EconError::DataNotAvailable {
                        what: format!("growth transformation in {}", flow.id),
                        hint: Some("dataset has no growth transformation; switch providers".into()),
                    })
                }
            }
        }

        let mut params = vec![
            ("dimensionAtObservation", "TIME_PERIOD".to_string()),
            ("format", "jsondata".to_string()),
        ];
        if let Some((start, end)) = query.range.years() {
            params.push(("startPeriod", start.to_string()));
            params.push(("endPeriod", end.to_string()));
        }
        let url = crate::rest::build_url(
            &self.base,
            &format!("data/{}/{}", flow.path_segment(), key.to_path()),
            &params,
        );
        let body: Value = self
            .http
            .get(keys::OECD, &url, &[SDMX_JSON_ACCEPT])
            .await?
            .ensure_success(keys::OECD)?
            .json()?;

        // Decode against the structure embedded in the response; its
        // positions describe exactly this slice of the cube.
        let response_dsd = Dsd::parse(&body)
            .map_err(|e| EconError::Data(format!("oecd data structure: {e}")))?;
        let dataset = DataSet::parse(&body)
            .map_err(|e| EconError::Data(format!("oecd dataset: {e}")))?;
        let sections = dataset
            .cross_sections(&response_dsd, &[])
            .map_err(|e| EconError::Data(format!("oecd decode: {e}")))?;
        if sections.is_empty() {
            return Err(EconError::data_not_available(format!(
                "{} for {}",
                flow.id,
                query.geo.label()
            )));
        }

        // Several units may survive the key (counts alongside rates); keep
        // one section per area, preferring the qualifier-appropriate unit.
        let preferences = Self::unit_preference(&query.indicator.qualifiers);
        let mut by_area: std::collections::BTreeMap<String, &econo_sdmx::CrossSection> =
            std::collections::BTreeMap::new();
        for section in &sections {
            let area = section
                .code("REF_AREA")
                .map_or_else(String::new, |c| c.id.clone());
            let preferred = section.code("UNIT_MEASURE").is_some_and(|unit| {
                let name = unit.name.to_lowercase();
                preferences.iter().any(|p| name.contains(p))
            });
            match by_area.get(&area) {
                Some(existing) => {
                    let existing_preferred =
                        existing.code("UNIT_MEASURE").is_some_and(|unit| {
                            let name = unit.name.to_lowercase();
                            preferences.iter().any(|p| name.contains(p))
                        });
                    if preferred && !existing_preferred {
                        by_area.insert(area, section);
                    }
                }
                None => {
                    by_area.insert(area, section);
                }
            }
        }

        let mut out = Vec::new();
        for section in by_area.values() {
            out.push(cross_section_to_series(
                keys::OECD,
                &flow.id,
                section,
                &query.indicator.label,
                url.clone(),
                format!("https://data-explorer.oecd.org/?df={}", flow.id),
            )?);
        }
        Ok(out.into())
    }
}
