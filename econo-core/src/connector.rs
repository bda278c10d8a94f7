//! Connector capability contract implemented by provider adapters.

use async_trait::async_trait;

use econo_types::{
    EconError, Frequency, GeoSelector, IndicatorRequest, NormalizedSeries, TimeRange, TradeFlow,
    Warning,
};

/// Broad data domain a connector can serve; the router keys its static
/// fallback chains on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DataDomain {
    /// Cross-country macroeconomic aggregates.
    GlobalMacro,
    /// US-specific time series.
    UsMacro,
    /// European statistics.
    EuroMacro,
    /// Canadian statistics.
    CanadaMacro,
    /// Bilateral trade by HS code.
    Trade,
    /// Cryptocurrency prices.
    Crypto,
    /// Currency pairs.
    ForeignExchange,
    /// Banking and financial stability statistics.
    Financial,
}

/// One series request as seen by an adapter: a single indicator against a
/// single geographic selector.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesQuery {
    /// The indicator to fetch.
    pub indicator: IndicatorRequest,
    /// Geographic scope. Group/world selectors may expand into several
    /// cross-sections.
    pub geo: GeoSelector,
    /// Requested time range (normalized; no relative form).
    pub range: TimeRange,
    /// Requested cadence, when the caller named one.
    pub frequency: Option<Frequency>,
}

/// One bilateral-trade request.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeQuery {
    /// Reporting country.
    pub reporter: GeoSelector,
    /// Counterparty; `None` means the world aggregate.
    pub partner: Option<GeoSelector>,
    /// Product name or HS code.
    pub product: String,
    /// Flow direction.
    pub flow: TradeFlow,
    /// Requested time range.
    pub range: TimeRange,
}

/// A candidate returned by a provider-native indicator search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorHit {
    /// Provider that owns the code.
    pub provider: String,
    /// Provider-native code.
    pub code: String,
    /// Display name.
    pub name: String,
}

/// A successful fetch: one series per cross-section plus any non-fatal
/// warnings raised during normalization (e.g. duplicate dates collapsed
/// last-wins).
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    /// Normalized series; a single-country query yields exactly one,
    /// group and world selectors may expand.
    pub series: Vec<NormalizedSeries>,
    /// Non-fatal problems attached to the response.
    pub warnings: Vec<Warning>,
}

impl FetchResponse {
    /// A warning-free response.
    #[must_use]
    pub fn new(series: Vec<NormalizedSeries>) -> Self {
        Self {
            series,
            warnings: Vec::new(),
        }
    }

    /// Attach a warning.
    #[must_use]
    pub fn with_warning(mut self, warning: Warning) -> Self {
        self.warnings.push(warning);
        self
    }
}

impl From<Vec<NormalizedSeries>> for FetchResponse {
    fn from(series: Vec<NormalizedSeries>) -> Self {
        Self::new(series)
    }
}

/// Focused role trait for connectors that serve normalized series.
#[async_trait]
pub trait SeriesProvider: Send + Sync {
    /// Fetch and normalize the series described by `query`.
    async fn fetch_series(&self, query: &SeriesQuery) -> Result<FetchResponse, EconError>;
}

/// Focused role trait for connectors that serve bilateral trade flows.
#[async_trait]
pub trait TradeFlowProvider: Send + Sync {
    /// Fetch one flow (or derived balance) series for `query`.
    async fn fetch_trade(&self, query: &TradeQuery) -> Result<NormalizedSeries, EconError>;
}

/// Focused role trait for connectors with a native series-search endpoint,
/// used as the last resort after the indicator index.
#[async_trait]
pub trait IndicatorSearchProvider: Send + Sync {
    /// Search the provider's own catalog.
    async fn search_indicators(
        &self,
        text: &str,
        limit: usize,
    ) -> Result<Vec<IndicatorHit>, EconError>;
}

/// Main connector trait implemented by provider adapters. Exposes
/// capability discovery; an adapter is a pure function of its inputs given
/// the HTTP pool, keeping no mutable state beyond adapter-local caches.
pub trait EconConnector: Send + Sync {
    /// Stable identifier used in routing configuration and breaker lookups
    /// (e.g. "fred").
    fn name(&self) -> &'static str;

    /// Human-friendly vendor string.
    fn vendor(&self) -> &'static str {
        "unknown"
    }

    /// Whether this connector claims to serve a given domain.
    ///
    /// Default: `false` for all domains; connectors must explicitly
    /// declare what they serve.
    fn supports(&self, domain: DataDomain) -> bool {
        let _ = domain;
        false
    }

    /// Advertise series capability by returning a usable trait object.
    fn as_series_provider(&self) -> Option<&dyn SeriesProvider> {
        None
    }

    /// Advertise trade capability by returning a usable trait object.
    fn as_trade_provider(&self) -> Option<&dyn TradeFlowProvider> {
        None
    }

    /// Advertise provider-native search.
    fn as_search_provider(&self) -> Option<&dyn IndicatorSearchProvider> {
        None
    }
}
