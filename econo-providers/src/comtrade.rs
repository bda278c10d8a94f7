//! UN Comtrade adapter: HS-coded bilateral trade flows and derived
//! balances.

use std::collections::BTreeMap;

use async_trait::async_trait;
use econo_core::connector::{DataDomain, EconConnector, TradeFlowProvider, TradeQuery};
use econo_core::series::validate_strictly_ascending;
use econo_core::HttpClient;
use econo_types::geo::{display_name_for_iso3, m49_for_iso3};
use econo_types::{
    scrub_secrets, EconError, Frequency, GeoSelector, NormalizedPoint, NormalizedSeries,
    SeriesMetadata, TradeFlow,
};
use serde_json::Value;

use crate::hs_codes::resolve_hs_code;
use crate::keys;
use crate::rest;

const DEFAULT_BASE: &str = "https://comtradeapi.un.org/data/v1/get";

/// The provider's aggregate code for the world partner.
const WORLD_PARTNER: u32 = 0;

/// UN Comtrade connector. Annual goods flows keyed by reporter/partner
/// M.49 codes and HS commodity codes.
pub struct ComtradeConnector {
    http: HttpClient,
    base: String,
    api_key: String,
}

impl ComtradeConnector {
    /// Build against the production base URL; the subscription key is
    /// filled by [`Self::with_api_key`].
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            base: DEFAULT_BASE.to_string(),
            api_key: String::new(),
        }
    }

    /// Set the subscription key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Point at a different base URL (tests, proxies).
    #[must_use]
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    fn reporter_code(geo: &GeoSelector) -> Result<u32, EconError> {
        match geo {
            GeoSelector::Country(iso3) => m49_for_iso3(iso3).ok_or_else(|| {
                EconError::InvalidArg(format!("no M.49 code for reporter {iso3}"))
            }),
            other => Err(EconError::InvalidArg(format!(
                "trade reporter must be a single country, got {}",
                other.label()
            ))),
        }
    }

    /// Partner expansion: world aggregate, a single country, or a group
    /// expanded to member codes (summed downstream when the provider lacks
    /// an aggregate).
    fn partner_codes(partner: Option<&GeoSelector>) -> Result<Vec<u32>, EconError> {
        match partner {
            None | Some(GeoSelector::World) => Ok(vec![WORLD_PARTNER]),
            Some(GeoSelector::Country(iso3)) => Ok(vec![m49_for_iso3(iso3).ok_or_else(
                || EconError::InvalidArg(format!("no M.49 code for partner {iso3}")),
            )?]),
            Some(GeoSelector::Group(group)) => group
                .members()
                .iter()
                .map(|iso3| {
                    m49_for_iso3(iso3).ok_or_else(|| {
                        EconError::InvalidArg(format!("no M.49 code for partner {iso3}"))
                    })
                })
                .collect(),
            Some(GeoSelector::Region(r)) => Err(EconError::InvalidArg(format!(
                "unsupported trade partner region {r}"
            ))),
        }
    }

    /// One flow fetch, summed across partners per period.
    async fn fetch_flow(
        &self,
        reporter: u32,
        partners: &[u32],
        hs_code: &str,
        periods: &str,
        flow_code: &str,
    ) -> Result<(BTreeMap<i32, f64>, String), EconError> {
        let partner_param = partners
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let url = rest::build_url(
            &self.base,
            "C/A/HS",
            &[
                ("reporterCode", reporter.to_string()),
                ("partnerCode", partner_param),
                ("period", periods.to_string()),
                ("cmdCode", hs_code.to_string()),
                ("flowCode", flow_code.to_string()),
                ("subscription-key", self.api_key.clone()),
            ],
        );
        let resp = self.http.get(keys::COMTRADE, &url, &[]).await?;
        if resp.status == 429 {
            // Surface the provider's back-off hint when it sends one in the
            // body; the orchestrator honors it once.
            let retry_after_ms = resp
                .json::<Value>()
                .ok()
                .and_then(|v| v.get("retryAfter").and_then(Value::as_u64))
                .map(|secs| secs * 1000);
            return Err(EconError::RateLimited {
                provider: keys::COMTRADE.to_string(),
                retry_after_ms,
            });
        }
        let body: Value = resp.ensure_success(keys::COMTRADE)?.json()?;
        let rows = body
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        // Group partners are summed per period only when every member
        // reported; a period with gaps stays absent and is emitted as
        // known-missing by the caller.
        let mut sums: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
        for row in &rows {
            let Some(period) = row
                .get("period")
                .and_then(|p| p.as_i64().or_else(|| p.as_str().and_then(|s| s.parse().ok())))
            else {
                continue;
            };
            let value = row.get("primaryValue").and_then(Value::as_f64).unwrap_or(0.0);
            let entry = sums.entry(period as i32).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
        let complete: BTreeMap<i32, f64> = sums
            .into_iter()
            .filter(|(_, (_, n))| partners.len() == 1 || *n == partners.len())
            .map(|(p, (v, _))| (p, v))
            .collect();
        Ok((complete, scrub_secrets(&url)))
    }
}

impl EconConnector for ComtradeConnector {
    fn name(&self) -> &'static str {
        keys::COMTRADE
    }
    fn vendor(&self) -> &'static str {
        "United Nations"
    }
    fn supports(&self, domain: DataDomain) -> bool {
        matches!(domain, DataDomain::Trade)
    }
    fn as_trade_provider(&self) -> Option<&dyn TradeFlowProvider> {
        Some(self as &dyn TradeFlowProvider)
    }
}

#[async_trait]
impl TradeFlowProvider for ComtradeConnector {
    async fn fetch_trade(&self, query: &TradeQuery) -> Result<NormalizedSeries, EconError> {
        let reporter = Self::reporter_code(&query.reporter)?;
        let partners = Self::partner_codes(query.partner.as_ref())?;
        let hs_code = resolve_hs_code(&query.product).ok_or_else(|| {
            EconError::IndicatorUnknown {
                label: query.product.clone(),
                suggestions: vec!["crude oil".into(), "cars".into(), "semiconductors".into()],
            }
        })?;

        let (start, end) = query.range.years().unwrap_or((2015, 2023));
        let periods = (start..=end)
            .map(|y| y.to_string())
            .collect::<Vec<_>>()
            .join(",");

        // Balance issues two fetches with the same key and derives
        // exports - imports per period.
        let (values, echo_url): (BTreeMap<i32, Option<f64>>, String) = match query.flow {
            TradeFlow::Exports | TradeFlow::Imports => {
                let flow_code = if query.flow == TradeFlow::Exports { "X" } else { "M" };
                let (flows, url) = self
                    .fetch_flow(reporter, &partners, &hs_code, &periods, flow_code)
                    .await?;
                (
                    (start..=end)
                        .map(|y| (y, flows.get(&y).copied()))
                        .collect(),
                    url,
                )
            }
            TradeFlow::Balance => {
                let (exports, url) = self
                    .fetch_flow(reporter, &partners, &hs_code, &periods, "X")
                    .await?;
                let (imports, _) = self
                    .fetch_flow(reporter, &partners, &hs_code, &periods, "M")
                    .await?;
                (
                    (start..=end)
                        .map(|y| {
                            let balance = match (exports.get(&y), imports.get(&y)) {
                                (Some(x), Some(m)) => Some(x - m),
                                _ => None,
                            };
                            (y, balance)
                        })
                        .collect(),
                    url,
                )
            }
        };

        let points: Vec<NormalizedPoint> = values
            .into_iter()
            .filter(|(_, v)| v.is_some() || query.flow == TradeFlow::Balance)
            .map(|(year, v)| NormalizedPoint::new(year.to_string(), v))
            .collect();
        if points.iter().all(|p| p.value.is_none()) {
            return Err(EconError::data_not_available(format!(
                "{} trade in {} ({start}-{end})",
                query.reporter.label(),
                query.product
            )));
        }
        validate_strictly_ascending(&points)?;

        let reporter_name = display_name_for_iso3(&query.reporter.label())
            .unwrap_or_else(|| query.reporter.label());
        let partner_label = query
            .partner
            .as_ref()
            .map_or_else(|| "World".to_string(), |p| {
                display_name_for_iso3(&p.label()).unwrap_or_else(|| p.label())
            });
        let flow_name = match query.flow {
            TradeFlow::Imports => "Imports",
            TradeFlow::Exports => "Exports",
            TradeFlow::Balance => "Trade balance",
        };

        Ok(NormalizedSeries {
            metadata: SeriesMetadata {
                source_provider: keys::COMTRADE.to_string(),
                indicator_code: hs_code.clone(),
                indicator_display: format!(
                    "{flow_name}: {} with {partner_label} ({})",
                    reporter_name,
                    if hs_code == "TOTAL" { "all goods" } else { &query.product }
                ),
                country_or_region: reporter_name,
                unit: "US$".to_string(),
                frequency: Some(Frequency::Annual),
                api_url_echo: echo_url,
                source_url: "https://comtradeplus.un.org".to_string(),
                ..SeriesMetadata::default()
            },
            points,
        })
    }
}
