//! Exchange-rate adapter (timeseries endpoint over currency pairs).

use async_trait::async_trait;
use econo_core::connector::{DataDomain, EconConnector, FetchResponse, SeriesProvider, SeriesQuery};
use econo_core::HttpClient;
use econo_types::{EconError, Frequency, NormalizedPoint, SeriesMetadata};
use serde_json::Value;

use crate::keys;
use crate::rest;

const DEFAULT_BASE: &str = "https://api.exchangerate.host";

const CURRENCIES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CHF", "CAD", "AUD", "NZD", "CNY", "SEK", "NOK", "DKK", "MXN",
    "BRL", "INR", "KRW", "SGD", "HKD", "TRY", "ZAR", "PLN",
];

/// Exchange-rate connector. Daily reference rates; intraday TTL class.
pub struct ExchangeRateConnector {
    http: HttpClient,
    base: String,
}

impl ExchangeRateConnector {
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

    /// Parse a currency pair out of free text: `EUR/USD`, `EURUSD`,
    /// `euro to dollar` style phrasings reduced to code pairs.
    fn parse_pair(label: &str) -> Option<(String, String)> {
        let upper = label.to_uppercase();
        let codes: Vec<&str> = CURRENCIES
            .iter()
            .filter(|c| upper.contains(**c))
            .copied()
            .collect();
        match codes.len() {
            2 => {
                // Order by first appearance in the text.
                let a = codes[0];
                let b = codes[1];
                if upper.find(a) <= upper.find(b) {
                    Some((a.to_string(), b.to_string()))
                } else {
                    Some((b.to_string(), a.to_string()))
                }
            }
            1 => Some((codes[0].to_string(), "USD".to_string())),
            _ => None,
        }
    }
}

impl EconConnector for ExchangeRateConnector {
    fn name(&self) -> &'static str {
        keys::EXCHANGERATE
    }
    fn vendor(&self) -> &'static str {
        "exchangerate.host"
    }
    fn supports(&self, domain: DataDomain) -> bool {
        matches!(domain, DataDomain::ForeignExchange)
    }
    fn as_series_provider(&self) -> Option<&dyn SeriesProvider> {
        Some(self as &dyn SeriesProvider)
    }
}

#[async_trait]
impl SeriesProvider for ExchangeRateConnector {
    async fn fetch_series(&self, query: &SeriesQuery) -> Result<FetchResponse, EconError> {
        let (base_ccy, quote_ccy) =
            Self::parse_pair(&query.indicator.label).ok_or_else(|| EconError::IndicatorUnknown {
                label: query.indicator.label.clone(),
                suggestions: vec!["EUR/USD".into(), "USD/JPY".into()],
            })?;
        if base_ccy == quote_ccy {
            return Err(EconError::InvalidArg(format!(
                "degenerate currency pair {base_ccy}/{quote_ccy}"
            )));
        }

        let (start, end) = match (&query.range.start, &query.range.end) {
            (Some(s), Some(e)) => (s.clone(), e.clone()),
            _ => {
                let today = chrono::Utc::now().date_naive();
                (
                    (today - chrono::Duration::days(365)).to_string(),
                    today.to_string(),
                )
            }
        };
        let url = rest::build_url(
            &self.base,
            "timeseries",
            &[
                ("base", base_ccy.clone()),
                ("symbols", quote_ccy.clone()),
                ("start_date", start),
                ("end_date", end),
            ],
        );
        let body: Value = self
            .http
            .get(keys::EXCHANGERATE, &url, &[])
            .await?
            .ensure_success(keys::EXCHANGERATE)?
            .json()?;

        let rates = body
            .get("rates")
            .and_then(Value::as_object)
            .ok_or_else(|| EconError::Data("timeseries without rates".into()))?;
        let points: Vec<NormalizedPoint> = rates
            .iter()
            .map(|(date, by_symbol)| {
                NormalizedPoint::new(
                    date.clone(),
                    by_symbol.get(&quote_ccy).and_then(Value::as_f64),
                )
            })
            .collect();
        rest::require_points(&points, &format!("{base_ccy}/{quote_ccy} rates"))?;

        let metadata = SeriesMetadata {
            source_provider: keys::EXCHANGERATE.to_string(),
            indicator_code: format!("{base_ccy}{quote_ccy}"),
            indicator_display: format!("{base_ccy}/{quote_ccy} exchange rate"),
            country_or_region: "global".to_string(),
            unit: format!("{quote_ccy} per {base_ccy}"),
            frequency: Some(Frequency::Daily),
            api_url_echo: url,
            source_url: "https://exchangerate.host".to_string(),
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

#[cfg(test)]
mod tests {
    use super::ExchangeRateConnector;

    #[test]
    fn pair_parsing_handles_common_phrasings() {
        assert_eq!(
            ExchangeRateConnector::parse_pair("EUR/USD"),
            Some(("EUR".into(), "USD".into()))
        );
        assert_eq!(
            ExchangeRateConnector::parse_pair("usd to jpy"),
            Some(("USD".into(), "JPY".into()))
        );
        assert_eq!(
            ExchangeRateConnector::parse_pair("GBP exchange rate"),
            Some(("GBP".into(), "USD".into()))
        );
        assert_eq!(ExchangeRateConnector::parse_pair("gold price"), None);
    }
}
