//! Provider routing: primary selection and ordered fallback chains.

use std::sync::Arc;

use econo_core::connector::EconConnector;
use econo_index::ScoredIndicator;
use econo_middleware::BreakerRegistry;
use econo_types::geo::CountryGroup;
use econo_types::{GeoSelector, IndicatorRequest, LowPriorityPolicy, ParsedIntent, RouterConfig};
use tracing::debug;

/// The rate-limit-scarce provider: never used as a default fallback, only
/// when the intent requests it explicitly (policy-configurable).
pub const LOW_PRIORITY_PROVIDER: &str = "oecd";

/// Static fallback preference for global macro indicators.
const GLOBAL_MACRO_CHAIN: &[&str] = &["worldbank", "imf", "oecd", "eurostat"];

/// Countries Eurostat covers as primary reporting geographies: EU members,
/// the Nordics, and the EFTA/ex-EU economies it publishes alongside them.
/// Deliberately narrower than the ISO2 table, which also carries major
/// non-European trading partners for bilateral dimensions.
fn is_european_country(iso3: &str) -> bool {
    CountryGroup::Eu27.members().contains(&iso3)
        || CountryGroup::Nordic.members().contains(&iso3)
        || matches!(iso3, "CHE" | "GBR")
}

/// A routed fetch plan for one indicator: the ordered chain plus providers
/// skipped because their breaker is open.
pub struct RoutedChain {
    /// Connectors to attempt in order.
    pub chain: Vec<Arc<dyn EconConnector>>,
    /// Names of providers skipped due to an open breaker.
    pub skipped: Vec<String>,
}

/// Chooses a primary provider and an ordered fallback chain from parsed
/// intent and index candidates.
pub struct Router {
    cfg: RouterConfig,
}

impl Router {
    /// A router over the given eligibility configuration.
    #[must_use]
    pub fn new(cfg: RouterConfig) -> Self {
        Self { cfg }
    }

    /// Whether the intent explicitly requests the low-priority provider
    /// under the configured policy.
    fn low_priority_explicit(&self, intent: &ParsedIntent) -> bool {
        match self.cfg.low_priority_policy {
            LowPriorityPolicy::ExplicitOnly => {
                intent.providers.first().map(String::as_str) == Some(LOW_PRIORITY_PROVIDER)
            }
            LowPriorityPolicy::WhenListed => intent
                .providers
                .iter()
                .any(|p| p == LOW_PRIORITY_PROVIDER),
            _ => false,
        }
    }

    /// Plan the chain for one indicator.
    ///
    /// Rules, in order: explicitly named providers; strong domain binding
    /// (trade, crypto, FX, US- or Canada-specific); the index candidates'
    /// top-ranked provider; the static domain fallback chain. Providers
    /// with an open breaker are skipped and reported; allow/deny lists
    /// prune throughout; the low-priority provider never enters as a
    /// fallback.
    #[must_use]
    pub fn plan(
        &self,
        intent: &ParsedIntent,
        indicator: &IndicatorRequest,
        candidates: &[ScoredIndicator],
        connectors: &[Arc<dyn EconConnector>],
        breakers: &BreakerRegistry,
    ) -> RoutedChain {
        let mut names: Vec<String> = Vec::new();
        let mut push = |name: &str, names: &mut Vec<String>| {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        };

        // 1. Explicit providers win.
        for provider in &intent.providers {
            push(provider, &mut names);
        }

        // 2. Strong domain bindings.
        if intent.is_crypto {
            push("coingecko", &mut names);
        }
        if intent.is_exchange_rate {
            push("exchangerate", &mut names);
        }
        if intent.is_trade_query {
            push("comtrade", &mut names);
        }
        let only_geo = |iso3: &str| {
            !intent.geography.is_empty()
                && intent
                    .geography
                    .iter()
                    .all(|g| matches!(g, GeoSelector::Country(c) if c == iso3))
        };
        if only_geo("USA") {
            push("fred", &mut names);
        }
        if only_geo("CAN") {
            push("statcan", &mut names);
        }
        let euro_only = !intent.geography.is_empty()
            && intent.geography.iter().all(|g| match g {
                GeoSelector::Country(c) => is_european_country(c),
                GeoSelector::Group(g) => matches!(g.tag(), "EU27" | "EURO_AREA" | "NORDIC"),
                _ => false,
            });
        if euro_only {
            push("eurostat", &mut names);
        }
        // Eurostat has nothing for a query whose every geography is a
        // non-European country; keep it out of the fallback tail too.
        let non_european_countries_only = !intent.geography.is_empty()
            && intent
                .geography
                .iter()
                .all(|g| matches!(g, GeoSelector::Country(c) if !is_european_country(c)));

        // 3. Top-ranked index candidates, best first.
        for candidate in candidates {
            push(&candidate.record.provider, &mut names);
        }

        // 4. Static domain fallback.
        if !intent.is_crypto && !intent.is_exchange_rate && !intent.is_trade_query {
            for provider in GLOBAL_MACRO_CHAIN {
                if *provider == "eurostat" && non_european_countries_only {
                    continue;
                }
                push(provider, &mut names);
            }
        }

        // 5. Pruning: allow/deny lists and the low-priority gate. The gate
        // keeps the provider when it entered through rule 1 under the
        // configured policy.
        let low_priority_ok = self.low_priority_explicit(intent);
        names.retain(|name| {
            if !self.cfg.permits(name) {
                return false;
            }
            name != LOW_PRIORITY_PROVIDER || low_priority_ok
        });

        // Materialize against registered connectors, skipping open
        // breakers without upstream I/O.
        let mut chain = Vec::new();
        let mut skipped = Vec::new();
        for name in &names {
            let Some(connector) = connectors.iter().find(|c| c.name() == name) else {
                continue;
            };
            if breakers.for_provider(name).is_open() {
                skipped.push(name.clone());
                continue;
            }
            chain.push(Arc::clone(connector));
        }

        debug!(
            target = "econo::router",
            indicator = %indicator.label,
            chain = ?chain.iter().map(|c| c.name()).collect::<Vec<_>>(),
            skipped = ?skipped,
            "routed"
        );
        RoutedChain { chain, skipped }
    }
}
