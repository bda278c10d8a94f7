//! The uniform time-series schema every adapter normalizes into.

use serde::{Deserialize, Serialize};

use crate::intent::{Frequency, ParsedIntent};

/// One observation. `value: None` denotes "known missing": the provider
/// reported the period but carried no number for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    /// Period label: an ISO date, `YYYY`, `YYYY-Qn`, or `YYYY-MM`.
    pub date: String,
    /// Observation value.
    pub value: Option<f64>,
}

impl NormalizedPoint {
    /// Convenience constructor.
    pub fn new(date: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            date: date.into(),
            value,
        }
    }
}

/// How a frequency conversion aggregated finer-grained observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    /// Arithmetic mean over the bucket (rates, indices).
    Mean,
    /// Sum over the bucket (flows).
    Sum,
    /// Last observation in the bucket.
    Last,
}

/// Provenance and description attached to every returned series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesMetadata {
    /// Provider that served the data (e.g. "fred").
    pub source_provider: String,
    /// Provider-native series/indicator code.
    pub indicator_code: String,
    /// Human-readable indicator name.
    pub indicator_display: String,
    /// Country or region the series describes.
    pub country_or_region: String,
    /// Unit of measure as reported upstream.
    pub unit: String,
    /// Observation cadence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
    /// Upstream last-updated stamp, when advertised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// The canonical URL actually issued upstream, with any secret replaced
    /// by a placeholder. Part of the provenance contract shown to users.
    pub api_url_echo: String,
    /// Human-facing source page.
    pub source_url: String,
    /// Seasonal-adjustment flag, when the provider distinguishes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seasonal_adjustment: Option<String>,
    /// Price type (real/nominal), when the provider distinguishes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_type: Option<String>,
    /// Set when the adapter converted frequency by aggregation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggregationMethod>,
}

/// A fully normalized series: metadata plus points in strictly ascending
/// period order, all sharing one frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSeries {
    /// Series provenance and description.
    pub metadata: SeriesMetadata,
    /// Observations, ascending by period.
    pub points: Vec<NormalizedPoint>,
}

impl NormalizedSeries {
    /// The last observation carrying a value, if any.
    #[must_use]
    pub fn latest_value(&self) -> Option<(&str, f64)> {
        self.points
            .iter()
            .rev()
            .find_map(|p| p.value.map(|v| (p.date.as_str(), v)))
    }
}

/// Non-fatal problem attached to an otherwise successful response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    /// Provider the warning concerns, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Indicator label the warning concerns, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl Warning {
    /// Warning not tied to a particular provider.
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            provider: None,
            indicator: None,
            message: message.into(),
        }
    }

    /// Warning attributed to a provider.
    pub fn for_provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: Some(provider.into()),
            indicator: None,
            message: message.into(),
        }
    }
}

/// The complete outcome of one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// The resolved intent the pipeline executed.
    pub intent: ParsedIntent,
    /// Normalized series in declared indicator x geography order.
    pub data: Vec<NormalizedSeries>,
    /// Non-fatal problems encountered along the way.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}
