//! Service wiring: everything the handlers need, initialized in a fixed
//! order and torn down in reverse.

use std::sync::Arc;

use econo_core::HttpClient;
use econo_index::IndicatorIndex;
use econo_middleware::{BreakerRegistry, BreakerSnapshot, CacheStats, ResponseCache};
use econo_types::{EconConfig, EconError};
use tracing::{info, warn};

use crate::intent::{HttpLlmClient, IntentResolver, LlmClient};
use crate::orchestrator::Orchestrator;
use crate::router::Router;

/// Bundles pool, breakers, cache, index, resolver, and orchestrator.
///
/// Initialization order is fixed: pool -> breakers -> cache -> index ->
/// resolver -> orchestrator. Teardown is reverse order; the only explicit
/// step is stopping the cache sweeper.
pub struct ServiceContext {
    config: EconConfig,
    cache: Arc<ResponseCache>,
    breakers: Arc<BreakerRegistry>,
    orchestrator: Orchestrator,
}

impl ServiceContext {
    /// Build the full pipeline from configuration. Providers without a
    /// required API key are disabled rather than failing startup.
    ///
    /// # Errors
    /// `EconError::Internal` when the HTTP pool or the indicator index
    /// cannot be constructed.
    pub async fn initialize(config: EconConfig) -> Result<Arc<Self>, EconError> {
        let http = HttpClient::new(&config.http)?;
        let breakers = Arc::new(BreakerRegistry::new(config.breaker));
        let cache = ResponseCache::new(&config.cache);
        let index = Arc::new(IndicatorIndex::open(&config.index_path)?);

        let llm: Option<Arc<dyn LlmClient>> = if config.llm.api_key.is_empty() {
            warn!(
                target = "econo::context",
                "no LLM key configured; intent resolution disabled"
            );
            None
        } else {
            Some(Arc::new(HttpLlmClient::new(http.clone(), config.llm.clone())))
        };
        let resolver = Arc::new(IntentResolver::new(llm));

        let connectors = econo_providers::configured_connectors(&config, &http, &index);
        info!(
            target = "econo::context",
            providers = ?connectors.iter().map(|c| c.name()).collect::<Vec<_>>(),
            "service context initialized"
        );

        let orchestrator = Orchestrator::new(
            connectors,
            Router::new(config.router.clone()),
            Arc::clone(&cache),
            Arc::clone(&breakers),
            index,
            resolver,
            config.request_budget,
        );

        Ok(Arc::new(Self {
            config,
            cache,
            breakers,
            orchestrator,
        }))
    }

    /// The query pipeline.
    #[must_use]
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// The startup configuration.
    #[must_use]
    pub fn config(&self) -> &EconConfig {
        &self.config
    }

    /// Response-cache counters.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Drop every cache entry.
    pub async fn cache_clear(&self) {
        self.cache.clear().await;
    }

    /// Breaker snapshots for `/health`.
    #[must_use]
    pub fn breaker_snapshots(&self) -> Vec<BreakerSnapshot> {
        self.breakers.snapshots()
    }

    /// Teardown in reverse initialization order. The HTTP pool drains on
    /// drop; the cache sweeper must be stopped explicitly.
    pub fn shutdown(&self) {
        self.cache.close();
        info!(target = "econo::context", "service context shut down");
    }
}
