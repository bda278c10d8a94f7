//! Structured intent emitted by the natural-language resolver.

use serde::{Deserialize, Serialize};

use crate::geo::CountryGroup;

/// A modifier that disambiguates which provider series to select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Qualifier {
    /// Inflation-adjusted series.
    Real,
    /// Current-price series.
    Nominal,
    /// Core measure (e.g. CPI excluding food and energy).
    Core,
    /// Per-capita normalization.
    PerCapita,
    /// Growth rate rather than level.
    Growth,
    /// Seasonally adjusted.
    SeasonallyAdjusted,
    /// Not seasonally adjusted.
    NotSeasonallyAdjusted,
}

/// One indicator the caller asked for, as understood by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorRequest {
    /// Free-text label (e.g. "unemployment rate").
    pub label: String,
    /// Provider series code when the caller named one verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_code: Option<String>,
    /// Disambiguating qualifiers extracted from the phrasing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualifiers: Vec<Qualifier>,
}

impl IndicatorRequest {
    /// Convenience constructor for a bare label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            explicit_code: None,
            qualifiers: Vec::new(),
        }
    }

    /// Whether the request carries the given qualifier.
    #[must_use]
    pub fn has_qualifier(&self, q: Qualifier) -> bool {
        self.qualifiers.contains(&q)
    }
}

/// Geographic scope of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum GeoSelector {
    /// A single country identified by its ISO3 code.
    Country(String),
    /// A symbolic multi-country aggregate (G7, BRICS, ...).
    Group(CountryGroup),
    /// The world aggregate.
    World,
    /// A free-form region tag the provider may understand natively.
    Region(String),
}

impl GeoSelector {
    /// Short human label used in metadata and warnings.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Country(iso3) => iso3.clone(),
            Self::Group(g) => g.tag().to_string(),
            Self::World => "WLD".to_string(),
            Self::Region(r) => r.clone(),
        }
    }
}

/// Relative time-range forms the resolver may emit before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
#[non_exhaustive]
pub enum RelativeRange {
    /// The trailing N calendar years.
    LastNYears {
        /// Number of years.
        n: u32,
    },
    /// The trailing N calendar months.
    LastNMonths {
        /// Number of months.
        n: u32,
    },
    /// Everything since the given year, inclusive.
    SinceYear {
        /// First year of the range.
        year: i32,
    },
    /// An explicit inclusive year range.
    Between {
        /// First year.
        start: i32,
        /// Last year.
        end: i32,
    },
    /// Year-to-date.
    Ytd,
    /// Only the most recent observation.
    Latest,
}

/// Resolved time range. `start`/`end` are ISO dates once the post-processor
/// has normalized any relative form against the wall clock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive start date (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// Inclusive end date (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    /// Relative form as emitted by the LLM; cleared by normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative: Option<RelativeRange>,
}

impl TimeRange {
    /// Inclusive year range covering both endpoints, when both are set.
    #[must_use]
    pub fn years(&self) -> Option<(i32, i32)> {
        let year_of = |s: &str| s.get(..4).and_then(|y| y.parse::<i32>().ok());
        match (self.start.as_deref(), self.end.as_deref()) {
            (Some(s), Some(e)) => Some((year_of(s)?, year_of(e)?)),
            _ => None,
        }
    }
}

/// Observation cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Daily observations.
    Daily,
    /// Weekly observations.
    Weekly,
    /// Monthly observations.
    Monthly,
    /// Quarterly observations.
    Quarterly,
    /// Annual observations.
    Annual,
}

impl Frequency {
    /// Single-letter SDMX-style code (`D`/`W`/`M`/`Q`/`A`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Daily => "D",
            Self::Weekly => "W",
            Self::Monthly => "M",
            Self::Quarterly => "Q",
            Self::Annual => "A",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annual => "annual",
        })
    }
}

/// Direction of a bilateral trade flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeFlow {
    /// Goods flowing into the reporter.
    Imports,
    /// Goods flowing out of the reporter.
    Exports,
    /// Exports minus imports, derived per period.
    Balance,
}

/// The structured outcome of intent resolution.
///
/// The resolver produces an intent, not a plan: provider tags are hints for
/// the router, and indicator labels are resolved to concrete codes by the
/// indicator index downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedIntent {
    /// Ordered candidate provider tags; may be empty when the router must
    /// infer.
    #[serde(default)]
    pub providers: Vec<String>,
    /// Ordered indicators the caller asked for.
    #[serde(default)]
    pub indicators: Vec<IndicatorRequest>,
    /// Ordered geographic selectors.
    #[serde(default)]
    pub geography: Vec<GeoSelector>,
    /// Requested time range.
    #[serde(default)]
    pub time_range: TimeRange,
    /// Requested cadence, when the caller named one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
    /// The query is about bilateral trade flows.
    #[serde(default)]
    pub is_trade_query: bool,
    /// The query compares several geographies or indicators.
    #[serde(default)]
    pub is_comparison: bool,
    /// The query is about a currency pair.
    #[serde(default)]
    pub is_exchange_rate: bool,
    /// The query is about a cryptocurrency.
    #[serde(default)]
    pub is_crypto: bool,
}

impl ParsedIntent {
    /// Total number of fetch branches implied by the intent
    /// (indicator x geography fan-out, with a floor of one geography).
    #[must_use]
    pub fn branch_count(&self) -> usize {
        self.indicators.len() * self.geography.len().max(1)
    }
}
