//! Configuration types shared across the workspace.
//!
//! Every knob has a typed default; `EconConfig::from_env` overlays the
//! closed set of environment options documented in the README.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// TTL class a cached result falls into, derived from the frequency of the
/// series it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlClass {
    /// Streaming intraday data (crypto, FX spot).
    Intraday,
    /// Daily-ish series.
    Daily,
    /// Monthly or quarterly series.
    MonthlyQuarterly,
    /// Annual series.
    Annual,
}

/// Response-cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Hard entry cap; LRU eviction beyond it.
    pub max_entries: u64,
    /// Interval of the background sweep that drops expired entries.
    pub sweep_interval: Duration,
    /// TTL per frequency class.
    pub ttl_by_class: HashMap<TtlClass, Duration>,
}

impl CacheConfig {
    /// TTL for a class, falling back to the daily TTL.
    #[must_use]
    pub fn ttl_for(&self, class: TtlClass) -> Duration {
        self.ttl_by_class
            .get(&class)
            .copied()
            .unwrap_or(Duration::from_secs(3600))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let mut ttl_by_class = HashMap::new();
        ttl_by_class.insert(TtlClass::Intraday, Duration::from_secs(60));
        ttl_by_class.insert(TtlClass::Daily, Duration::from_secs(3600));
        ttl_by_class.insert(TtlClass::MonthlyQuarterly, Duration::from_secs(12 * 3600));
        ttl_by_class.insert(TtlClass::Annual, Duration::from_secs(24 * 3600));
        Self {
            max_entries: 2048,
            sweep_interval: Duration::from_secs(60),
            ttl_by_class,
        }
    }
}

/// Circuit-breaker thresholds, shared by every provider's breaker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Failures within `window` that open the breaker.
    pub failure_threshold: u32,
    /// Consecutive half-open successes that close it again.
    pub success_threshold: u32,
    /// Rolling failure-counting window.
    pub window: Duration,
    /// Time an open breaker waits before admitting a trial call.
    pub recovery_timeout: Duration,
    /// Concurrent trial calls admitted while half-open.
    pub half_open_max_calls: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            window: Duration::from_secs(60),
            recovery_timeout: Duration::from_secs(30),
            half_open_max_calls: 1,
        }
    }
}

/// Shared HTTP pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Total idle connections kept alive per host.
    pub pool_max_idle_per_host: usize,
    /// Keepalive expiry for idle connections.
    pub pool_idle_timeout: Duration,
    /// Per-request deadline.
    pub request_timeout: Duration,
    /// TCP connect deadline.
    pub connect_timeout: Duration,
    /// User-agent sent on every outbound call.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 8,
            pool_idle_timeout: Duration::from_secs(90),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("econo/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Intent-resolver backend selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider selector (e.g. "openai", "anthropic", or a compatible
    /// gateway).
    pub provider: String,
    /// Model identifier passed through to the backend.
    pub model: String,
    /// Bearer key; empty disables the resolver (queries fail with an intent
    /// error).
    pub api_key: String,
    /// Override for the chat-completions endpoint, for gateways and tests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// How the rate-limit-scarce low-priority provider participates in
/// fallback chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum LowPriorityPolicy {
    /// Only when the intent names it as the sole or first provider.
    #[default]
    ExplicitOnly,
    /// Any intent that lists it counts as explicit.
    WhenListed,
}

/// Router configuration: provider eligibility and the low-priority gate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterConfig {
    /// When non-empty, only these provider names are eligible.
    pub allow: Vec<String>,
    /// Providers never considered.
    pub deny: Vec<String>,
    /// Gate for the low-priority provider.
    pub low_priority_policy: LowPriorityPolicy,
}

impl RouterConfig {
    /// Whether a provider passes the allow/deny lists.
    #[must_use]
    pub fn permits(&self, provider: &str) -> bool {
        if self.deny.iter().any(|d| d == provider) {
            return false;
        }
        self.allow.is_empty() || self.allow.iter().any(|a| a == provider)
    }
}

/// Top-level configuration assembled at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EconConfig {
    /// Intent-resolver backend.
    pub llm: LlmConfig,
    /// Per-provider API keys; a missing key disables the provider rather
    /// than failing startup.
    pub provider_keys: HashMap<String, String>,
    /// Response-cache knobs.
    pub cache: CacheConfig,
    /// HTTP pool knobs.
    pub http: HttpConfig,
    /// Breaker thresholds.
    pub breaker: BreakerConfig,
    /// Router eligibility.
    pub router: RouterConfig,
    /// Total budget for one inbound request.
    pub request_budget: Duration,
    /// Path of the indicator index; `:memory:` builds an empty one.
    pub index_path: String,
}

impl EconConfig {
    /// Read the closed set of `ECONO_*` environment options over defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut cfg = Self {
            request_budget: Duration::from_secs(90),
            index_path: ":memory:".to_string(),
            ..Self::default()
        };

        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        if let Some(v) = var("ECONO_LLM_PROVIDER") {
            cfg.llm.provider = v;
        }
        if let Some(v) = var("ECONO_LLM_MODEL") {
            cfg.llm.model = v;
        }
        if let Some(v) = var("ECONO_LLM_API_KEY") {
            cfg.llm.api_key = v;
        }
        if let Some(v) = var("ECONO_LLM_BASE_URL") {
            cfg.llm.base_url = Some(v);
        }
        for provider in [
            "fred",
            "worldbank",
            "imf",
            "coingecko",
            "exchangerate",
            "comtrade",
            "oecd",
            "eurostat",
            "bis",
            "statcan",
        ] {
            let env_name = format!("ECONO_{}_API_KEY", provider.to_ascii_uppercase());
            if let Some(v) = var(&env_name) {
                cfg.provider_keys.insert(provider.to_string(), v);
            }
        }
        if let Some(v) = var("ECONO_CACHE_MAX_ENTRIES").and_then(|v| v.parse().ok()) {
            cfg.cache.max_entries = v;
        }
        if let Some(v) = var("ECONO_CACHE_SWEEP_SECS").and_then(|v| v.parse().ok()) {
            cfg.cache.sweep_interval = Duration::from_secs(v);
        }
        if let Some(v) = var("ECONO_HTTP_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            cfg.http.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = var("ECONO_REQUEST_BUDGET_SECS").and_then(|v| v.parse().ok()) {
            cfg.request_budget = Duration::from_secs(v);
        }
        if let Some(v) = var("ECONO_BREAKER_FAILURE_THRESHOLD").and_then(|v| v.parse().ok()) {
            cfg.breaker.failure_threshold = v;
        }
        if let Some(v) = var("ECONO_BREAKER_RECOVERY_SECS").and_then(|v| v.parse().ok()) {
            cfg.breaker.recovery_timeout = Duration::from_secs(v);
        }
        if let Some(v) = var("ECONO_PROVIDER_ALLOW") {
            cfg.router.allow = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Some(v) = var("ECONO_PROVIDER_DENY") {
            cfg.router.deny = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Some(v) = var("ECONO_LOW_PRIORITY_POLICY") {
            cfg.router.low_priority_policy = match v.as_str() {
                "when_listed" => LowPriorityPolicy::WhenListed,
                _ => LowPriorityPolicy::ExplicitOnly,
            };
        }
        if let Some(v) = var("ECONO_INDEX_PATH") {
            cfg.index_path = v;
        }
        cfg
    }
}
