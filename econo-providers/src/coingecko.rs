//! CoinGecko cryptocurrency price adapter.

use async_trait::async_trait;
use chrono::DateTime;
use econo_core::connector::{DataDomain, EconConnector, FetchResponse, SeriesProvider, SeriesQuery};
use econo_core::HttpClient;
use econo_types::{EconError, Frequency, NormalizedPoint, SeriesMetadata};
use serde_json::Value;

use crate::keys;
use crate::rest;

const DEFAULT_BASE: &str = "https://api.coingecko.com/api/v3";

const COIN_IDS: &[(&str, &str)] = &[
    ("bitcoin", "bitcoin"),
    ("btc", "bitcoin"),
    ("ethereum", "ethereum"),
    ("eth", "ethereum"),
    ("solana", "solana"),
    ("sol", "solana"),
    ("cardano", "cardano"),
    ("dogecoin", "dogecoin"),
    ("ripple", "ripple"),
    ("xrp", "ripple"),
    ("litecoin", "litecoin"),
    ("polkadot", "polkadot"),
    ("tether", "tether"),
];

/// CoinGecko connector. Daily close prices in USD; streaming-intraday TTL
/// class at the cache.
pub struct CoinGeckoConnector {
    http: HttpClient,
    base: String,
}

impl CoinGeckoConnector {
    /// Build against the public API base URL.
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

    async fn resolve_coin_id(&self, label: &str) -> Result<String, EconError> {
        let needle = label.trim().to_lowercase();
        // Strip common phrasing: "bitcoin price", "price of bitcoin".
        let needle = needle
            .trim_start_matches("price of ")
            .trim_end_matches(" price")
            .trim();
        if let Some((_, id)) = COIN_IDS.iter().find(|(name, _)| *name == needle) {
            return Ok((*id).to_string());
        }
        let url = rest::build_url(&self.base, "search", &[("query", needle.to_string())]);
        let body: Value = self
            .http
            .get(keys::COINGECKO, &url, &[])
            .await?
            .ensure_success(keys::COINGECKO)?
            .json()?;
        body.pointer("/coins/0/id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| EconError::IndicatorUnknown {
                label: label.to_string(),
                suggestions: Vec::new(),
            })
    }
}

impl EconConnector for CoinGeckoConnector {
    fn name(&self) -> &'static str {
        keys::COINGECKO
    }
    fn vendor(&self) -> &'static str {
        "CoinGecko"
    }
    fn supports(&self, domain: DataDomain) -> bool {
        matches!(domain, DataDomain::Crypto)
    }
    fn as_series_provider(&self) -> Option<&dyn SeriesProvider> {
        Some(self as &dyn SeriesProvider)
    }
}

#[async_trait]
impl SeriesProvider for CoinGeckoConnector {
    async fn fetch_series(&self, query: &SeriesQuery) -> Result<FetchResponse, EconError> {
        let coin_id = self.resolve_coin_id(&query.indicator.label).await?;

        let days = match query.range.years() {
            Some((start, end)) => ((end - start).unsigned_abs() * 365 + 365).min(3650),
            None => 365,
        };
        let url = rest::build_url(
            &self.base,
            &format!("coins/{coin_id}/market_chart"),
            &[
                ("vs_currency", "usd".to_string()),
                ("days", days.to_string()),
                ("interval", "daily".to_string()),
            ],
        );
        let body: Value = self
            .http
            .get(keys::COINGECKO, &url, &[])
            .await?
            .ensure_success(keys::COINGECKO)?
            .json()?;

        let prices = body
            .get("prices")
            .and_then(Value::as_array)
            .ok_or_else(|| EconError::Data("market_chart without prices".into()))?;

        let points: Vec<NormalizedPoint> = prices
            .iter()
            .filter_map(|pair| {
                let ms = pair.get(0)?.as_i64()?;
                let price = pair.get(1)?.as_f64();
                let date = DateTime::from_timestamp_millis(ms)?;
                Some(NormalizedPoint::new(
                    date.format("%Y-%m-%d").to_string(),
                    price,
                ))
            })
            .collect();
        rest::require_points(&points, &format!("{coin_id} prices"))?;

        let metadata = SeriesMetadata {
            source_provider: keys::COINGECKO.to_string(),
            indicator_code: coin_id.clone(),
            indicator_display: format!("{coin_id} price"),
            country_or_region: "global".to_string(),
            unit: "USD".to_string(),
            frequency: Some(Frequency::Daily),
            api_url_echo: url,
            source_url: format!("https://www.coingecko.com/en/coins/{coin_id}"),
            ..SeriesMetadata::default()
        };
        let (series, _) = rest::finalize_series(
            metadata,
            points,
            query.frequency,
            &query.indicator.qualifiers,
        )?;
        Ok(vec![series].into())
    }
}
