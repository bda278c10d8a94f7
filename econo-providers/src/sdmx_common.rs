//! Shared plumbing for the SDMX adapter family: DSD cache, dataflow
//! catalog, agency inference, and cross-section -> series conversion.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use econo_core::series::normalize_points;
use econo_core::HttpClient;
use econo_sdmx::{CrossSection, DataflowRef, Dsd};
use econo_types::{EconError, Frequency, NormalizedSeries, SeriesMetadata};
use parking_lot::RwLock;
use serde_json::Value;

/// SDMX data media type requested from every provider in the family.
pub const SDMX_JSON_ACCEPT: (&str, &str) = (
    "accept",
    "application/vnd.sdmx.data+json;version=2.0.0",
);

/// Structural patterns in OECD dataflow ids mapped to maintaining
/// agencies. A fixed lookup table; first match wins.
const AGENCY_PATTERNS: &[(&str, &str)] = &[
    ("LFS", "OECD.SDD.TPS"),
    ("UNE", "OECD.SDD.TPS"),
    ("EMP", "OECD.SDD.TPS"),
    ("QNA", "OECD.SDD.NAD"),
    ("NAAG", "OECD.SDD.NAD"),
    ("GDP", "OECD.SDD.NAD"),
    ("PRICES", "OECD.SDD.TPS"),
    ("CPI", "OECD.SDD.TPS"),
    ("KEI", "OECD.SDD.STES"),
    ("STES", "OECD.SDD.STES"),
    ("FIN", "OECD.SDD.NAD"),
    ("TRADE", "OECD.SDD.TPS"),
];

/// Infer the maintaining agency for an OECD dataflow id.
#[must_use]
pub fn infer_agency(dataflow_id: &str) -> &'static str {
    let upper = dataflow_id.to_ascii_uppercase();
    AGENCY_PATTERNS
        .iter()
        .find(|(pattern, _)| upper.contains(pattern))
        .map_or("OECD.SDD.NAD", |(_, agency)| agency)
}

/// One catalog entry, as loaded from the provider's dataflow listing.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Dataflow reference.
    pub flow: DataflowRef,
    /// Human name of the dataflow.
    pub name: String,
}

/// The dataflow catalog, loaded once at process start and queried by token
/// overlap. The top-K candidates feed the resolver's semantic validation.
#[derive(Debug, Default)]
pub struct DataflowCatalog {
    entries: Vec<CatalogEntry>,
}

impl DataflowCatalog {
    /// Parse a catalog from an SDMX-JSON dataflow listing.
    #[must_use]
    pub fn from_message(message: &Value) -> Self {
        let mut entries = Vec::new();
        if let Some(flows) = message
            .pointer("/data/dataflows")
            .and_then(Value::as_array)
        {
            for flow in flows {
                let id = flow.get("id").and_then(Value::as_str).unwrap_or_default();
                if id.is_empty() {
                    continue;
                }
                let agency = flow
                    .get("agencyID")
                    .and_then(Value::as_str)
                    .map_or_else(|| infer_agency(id).to_string(), str::to_string);
                let version = flow
                    .get("version")
                    .and_then(Value::as_str)
                    .unwrap_or("1.0")
                    .to_string();
                let name = flow
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or(id)
                    .to_string();
                entries.push(CatalogEntry {
                    flow: DataflowRef::new(agency, id, version),
                    name,
                });
            }
        }
        Self { entries }
    }

    /// Number of entries loaded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-K dataflows by token overlap with the label.
    #[must_use]
    pub fn search(&self, label: &str, limit: usize) -> Vec<&CatalogEntry> {
        let tokens: Vec<String> = label
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 2)
            .map(str::to_string)
            .collect();
        let mut scored: Vec<(usize, &CatalogEntry)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let haystack = format!(
                    "{} {}",
                    entry.name.to_lowercase(),
                    entry.flow.id.to_lowercase()
                );
                let score = tokens.iter().filter(|t| haystack.contains(t.as_str())).count();
                (score > 0).then_some((score, entry))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(limit).map(|(_, e)| e).collect()
    }
}

/// Process-lifetime DSD cache with a long TTL, shared by the adapters of
/// one provider.
pub struct DsdCache {
    ttl: Duration,
    entries: RwLock<HashMap<DataflowRef, (Instant, std::sync::Arc<Dsd>)>>,
}

impl DsdCache {
    /// A cache with the given TTL (DSDs change rarely; hours is right).
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cached DSD, when fresh.
    #[must_use]
    pub fn get(&self, flow: &DataflowRef) -> Option<std::sync::Arc<Dsd>> {
        let entries = self.entries.read();
        entries
            .get(flow)
            .filter(|(inserted, _)| inserted.elapsed() < self.ttl)
            .map(|(_, dsd)| std::sync::Arc::clone(dsd))
    }

    /// Insert a freshly fetched DSD.
    pub fn put(&self, flow: DataflowRef, dsd: Dsd) -> std::sync::Arc<Dsd> {
        let arc = std::sync::Arc::new(dsd);
        self.entries
            .write()
            .insert(flow, (Instant::now(), std::sync::Arc::clone(&arc)));
        arc
    }
}

/// Fetch and parse a dataflow's DSD through the cache.
pub async fn dsd_for(
    cache: &DsdCache,
    http: &HttpClient,
    provider: &str,
    base: &str,
    flow: &DataflowRef,
) -> Result<std::sync::Arc<Dsd>, EconError> {
    if let Some(dsd) = cache.get(flow) {
        return Ok(dsd);
    }
    let url = format!(
        "{}/dataflow/{}?references=all&format=sdmx-json",
        base.trim_end_matches('/'),
        flow.path_segment().replace(',', "/")
    );
    let body: Value = http
        .get(provider, &url, &[SDMX_JSON_ACCEPT])
        .await?
        .ensure_success(provider)?
        .json()?;
    let dsd = Dsd::parse(&body)
        .map_err(|e| EconError::Data(format!("{provider} DSD for {}: {e}", flow.path_segment())))?;
    Ok(cache.put(flow.clone(), dsd))
}

/// Convert one decoded cross-section into a normalized series.
pub fn cross_section_to_series(
    provider: &str,
    flow_id: &str,
    section: &CrossSection,
    indicator_display: &str,
    api_url_echo: String,
    source_url: String,
) -> Result<NormalizedSeries, EconError> {
    let points = section
        .points
        .iter()
        .map(|(label, value)| econo_types::NormalizedPoint::new(normalize_sdmx_period(label), *value))
        .collect();
    let (points, _) = normalize_points(points)?;

    let country = section
        .code("REF_AREA")
        .or_else(|| section.code("geo"))
        .or_else(|| section.code("LOCATION"))
        .map_or_else(String::new, |c| {
            if c.name.is_empty() { c.id.clone() } else { c.name.clone() }
        });
    let unit = section
        .code("UNIT_MEASURE")
        .or_else(|| section.code("unit"))
        .map_or_else(String::new, |c| {
            if c.name.is_empty() { c.id.clone() } else { c.name.clone() }
        });
    let frequency = section
        .code("FREQ")
        .or_else(|| section.code("freq"))
        .and_then(|c| match c.id.as_str() {
            "A" => Some(Frequency::Annual),
            "Q" => Some(Frequency::Quarterly),
            "M" => Some(Frequency::Monthly),
            "W" => Some(Frequency::Weekly),
            "D" => Some(Frequency::Daily),
            _ => None,
        });
    let seasonal = section.code("s_adj").or_else(|| section.code("ADJUSTMENT")).map(|c| c.id.clone());

    Ok(NormalizedSeries {
        metadata: SeriesMetadata {
            source_provider: provider.to_string(),
            indicator_code: flow_id.to_string(),
            indicator_display: indicator_display.to_string(),
            country_or_region: country,
            unit,
            frequency,
            api_url_echo,
            source_url,
            seasonal_adjustment: seasonal,
            ..SeriesMetadata::default()
        },
        points,
    })
}

/// SDMX period labels: `2019`, `2019-Q1`/`2019Q1`, `2019-05`, `2019-M05`.
#[must_use]
pub fn normalize_sdmx_period(label: &str) -> String {
    let label = label.trim();
    if let Some(pos) = label.find(['Q', 'q']) {
        if !label.contains('-') {
            let (year, q) = label.split_at(pos);
            return format!("{year}-Q{}", &q[1..]);
        }
    }
    if let Some(rest) = label.split_once("-M").map(|(y, m)| format!("{y}-{m}")) {
        return rest;
    }
    label.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agency_inference_uses_pattern_table() {
        assert_eq!(infer_agency("DSD_LFS@DF_IALFS_UNE_M"), "OECD.SDD.TPS");
        assert_eq!(infer_agency("QNA_EXPENDITURE"), "OECD.SDD.NAD");
        assert_eq!(infer_agency("SOMETHING_ELSE"), "OECD.SDD.NAD");
    }

    #[test]
    fn period_normalization() {
        assert_eq!(normalize_sdmx_period("2019Q2"), "2019-Q2");
        assert_eq!(normalize_sdmx_period("2019-Q2"), "2019-Q2");
        assert_eq!(normalize_sdmx_period("2019-M05"), "2019-05");
        assert_eq!(normalize_sdmx_period("2019"), "2019");
    }

    #[test]
    fn catalog_search_ranks_by_token_overlap() {
        let message = serde_json::json!({
            "data": {"dataflows": [
                {"id": "DF_IALFS_UNE_M", "name": "Unemployment rates, monthly", "agencyID": "OECD.SDD.TPS", "version": "1.0"},
                {"id": "QNA", "name": "Quarterly national accounts GDP", "agencyID": "OECD.SDD.NAD", "version": "1.1"},
                {"id": "HEALTH_STAT", "name": "Health status", "version": "1.0"}
            ]}
        });
        let catalog = DataflowCatalog::from_message(&message);
        assert_eq!(catalog.len(), 3);
        let hits = catalog.search("unemployment rate", 2);
        assert_eq!(hits[0].flow.id, "DF_IALFS_UNE_M");
    }
}
