//! Provider adapters for the econo query engine.
//!
//! One module per upstream provider, each implementing the
//! [`econo_core::EconConnector`] capability contract. Adapters are pure
//! functions of their inputs given the shared HTTP pool; the only
//! adapter-local state is caches (SDMX DSDs, the OECD dataflow catalog).

#![warn(missing_docs)]

use std::sync::Arc;

use econo_core::{EconConnector, HttpClient};
use econo_index::IndicatorIndex;
use econo_types::EconConfig;

pub mod bis;
pub mod coingecko;
pub mod comtrade;
pub mod exchangerate;
pub mod fred;
mod hs_codes;
pub mod imf;
mod rest;
mod sdmx_common;
pub mod eurostat;
pub mod oecd;
pub mod statcan;
pub mod worldbank;

pub use hs_codes::resolve_hs_code;

/// Stable provider names used in routing configuration.
pub mod keys {
    /// FRED (St. Louis Fed).
    pub const FRED: &str = "fred";
    /// World Bank open data.
    pub const WORLDBANK: &str = "worldbank";
    /// IMF datamapper.
    pub const IMF: &str = "imf";
    /// CoinGecko crypto prices.
    pub const COINGECKO: &str = "coingecko";
    /// Exchange-rate API.
    pub const EXCHANGERATE: &str = "exchangerate";
    /// UN Comtrade.
    pub const COMTRADE: &str = "comtrade";
    /// OECD SDMX.
    pub const OECD: &str = "oecd";
    /// Eurostat.
    pub const EUROSTAT: &str = "eurostat";
    /// BIS statistics.
    pub const BIS: &str = "bis";
    /// Statistics Canada WDS.
    pub const STATCAN: &str = "statcan";
}

/// Build every adapter the configuration enables. A provider whose API key
/// is required but absent is disabled rather than an error. The OECD
/// dataflow catalog starts loading in the background here, once per
/// process; until it lands (or if it fails) resolution falls back to
/// aliases and the indicator index.
#[must_use]
pub fn configured_connectors(
    cfg: &EconConfig,
    http: &HttpClient,
    index: &Arc<IndicatorIndex>,
) -> Vec<Arc<dyn EconConnector>> {
    let mut out: Vec<Arc<dyn EconConnector>> = Vec::new();
    let key = |name: &str| cfg.provider_keys.get(name).cloned();

    // Keyed providers are disabled without a key.
    if let Some(k) = key(keys::FRED) {
        out.push(Arc::new(
            fred::FredConnector::new(http.clone())
                .with_api_key(k)
                .with_index(Arc::clone(index)),
        ));
    }
    if let Some(k) = key(keys::COMTRADE) {
        out.push(Arc::new(
            comtrade::ComtradeConnector::new(http.clone()).with_api_key(k),
        ));
    }

    // Open providers need no key. StatCan's WDS is keyless; a configured
    // key is attached but never required.
    let mut statcan = statcan::StatcanConnector::new(http.clone());
    if let Some(k) = key(keys::STATCAN) {
        statcan = statcan.with_api_key(k);
    }
    out.push(Arc::new(statcan));
    out.push(Arc::new(
        worldbank::WorldBankConnector::new(http.clone()).with_index(Arc::clone(index)),
    ));
    out.push(Arc::new(imf::ImfConnector::new(http.clone())));
    out.push(Arc::new(coingecko::CoinGeckoConnector::new(http.clone())));
    out.push(Arc::new(
        exchangerate::ExchangeRateConnector::new(http.clone()),
    ));
    let oecd = Arc::new(oecd::OecdConnector::new(http.clone()).with_index(Arc::clone(index)));
    let catalog_loader = Arc::clone(&oecd);
    tokio::spawn(async move {
        if let Err(e) = catalog_loader.load_catalog().await {
            tracing::warn!(target = "econo::providers", error = %e, "oecd dataflow catalog unavailable");
        }
    });
    out.push(oecd);
    out.push(Arc::new(
        eurostat::EurostatConnector::new(http.clone()).with_index(Arc::clone(index)),
    ));
    out.push(Arc::new(bis::BisConnector::new(http.clone())));

    out.retain(|c| cfg.router.permits(c.name()));
    out
}
