//! Unified error taxonomy for the econo workspace.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the econo workspace.
///
/// Adapters convert provider-specific failure modes into this taxonomy at
/// the boundary; the orchestrator decides recovery vs. surface; the inbound
/// handler maps kinds to HTTP statuses.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EconError {
    /// The requested capability is not implemented by the target connector.
    #[error("unsupported capability: {capability}")]
    Unsupported {
        /// Capability string (e.g. "series", "trade").
        capability: String,
    },

    /// Invalid input argument; never retried.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// The query needs clarification before it can be executed.
    #[error("ambiguous query: {message}")]
    Ambiguous {
        /// Why the query could not be resolved.
        message: String,
        /// Nearest candidates to offer the caller.
        suggestions: Vec<String>,
    },

    /// The LLM returned an unparseable structure after retry.
    #[error("intent resolution failed: {0}")]
    Intent(String),

    /// Upstream answered but carried no data; not an I/O fault.
    #[error("data not available: {what}")]
    DataNotAvailable {
        /// What was asked for.
        what: String,
        /// Optional recovery hint (e.g. "try provider X").
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },

    /// The request could not be mapped to a provider code.
    #[error("unknown indicator: {label}")]
    IndicatorUnknown {
        /// The label that failed to resolve.
        label: String,
        /// Nearest candidates from the index.
        suggestions: Vec<String>,
    },

    /// Transport-level I/O failure.
    #[error("network error from {provider}: {msg}")]
    Network {
        /// Provider whose call failed.
        provider: String,
        /// Description of the failure.
        msg: String,
    },

    /// A provider call exceeded its deadline.
    #[error("timeout: {capability} via {provider}")]
    Timeout {
        /// Provider that timed out.
        provider: String,
        /// Capability label.
        capability: String,
    },

    /// The overall request exceeded the configured budget.
    #[error("request timed out: {capability}")]
    RequestTimeout {
        /// Capability label.
        capability: String,
    },

    /// Non-2xx upstream response or a malformed body.
    #[error("upstream error from {provider}: status {status}")]
    Upstream {
        /// Provider that answered.
        provider: String,
        /// HTTP status code.
        status: u16,
        /// Truncated response body for diagnostics.
        body: String,
    },

    /// Upstream 429.
    #[error("rate limited by {provider}")]
    RateLimited {
        /// Provider that throttled us.
        provider: String,
        /// Retry-after hint in milliseconds, when advertised.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_after_ms: Option<u64>,
    },

    /// The provider's circuit breaker is open; no upstream I/O was issued.
    #[error("circuit open for {provider}; retry in {retry_in_ms}ms")]
    CircuitOpen {
        /// Gated provider.
        provider: String,
        /// Milliseconds until the breaker admits a trial call.
        retry_in_ms: u64,
    },

    /// A provider failed in a way no other variant captures.
    #[error("{provider} failed: {msg}")]
    Provider {
        /// Provider name.
        provider: String,
        /// Human-readable message.
        msg: String,
    },

    /// Every link of a fallback chain failed; contains the individual
    /// failures in attempt order.
    #[error("all providers failed: {0:?}")]
    AllProvidersFailed(Vec<EconError>),

    /// Malformed or inconsistent data encountered while decoding.
    #[error("data issue: {0}")]
    Data(String),

    /// Programming fault; logged with the request fingerprint.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification used for progress events and HTTP mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or ambiguous request.
    Client,
    /// No indicator/provider combination satisfies the request.
    Resolution,
    /// Upstream failed after the fallback chain was exhausted.
    Upstream,
    /// The intent resolver (LLM) is unavailable or unusable.
    Intent,
    /// A deadline was exceeded.
    Timeout,
    /// Programming fault.
    Internal,
}

impl ErrorKind {
    /// HTTP status code this kind maps to at the inbound boundary.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Client => 400,
            Self::Resolution => 404,
            Self::Upstream => 502,
            Self::Intent => 503,
            Self::Timeout => 504,
            Self::Internal => 500,
        }
    }
}

impl EconError {
    /// Helper: build an `Unsupported` error for a capability string.
    #[must_use]
    pub fn unsupported(cap: impl Into<String>) -> Self {
        Self::Unsupported {
            capability: cap.into(),
        }
    }

    /// Helper: build a `Provider` error with the provider name and message.
    pub fn provider(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `DataNotAvailable` error without a hint.
    pub fn data_not_available(what: impl Into<String>) -> Self {
        Self::DataNotAvailable {
            what: what.into(),
            hint: None,
        }
    }

    /// Helper: build a `Timeout` error.
    pub fn timeout(provider: impl Into<String>, capability: impl Into<String>) -> Self {
        Self::Timeout {
            provider: provider.into(),
            capability: capability.into(),
        }
    }

    /// Helper: build a `RequestTimeout` error.
    #[must_use]
    pub fn request_timeout(capability: impl Into<String>) -> Self {
        Self::RequestTimeout {
            capability: capability.into(),
        }
    }

    /// Helper: build an `Upstream` error, truncating the body to a
    /// diagnosable prefix.
    pub fn upstream(provider: impl Into<String>, status: u16, body: &str) -> Self {
        let mut truncated = body.chars().take(256).collect::<String>();
        if truncated.len() < body.len() {
            truncated.push_str("...");
        }
        Self::Upstream {
            provider: provider.into(),
            status,
            body: truncated,
        }
    }

    /// Whether this failure counts against the provider's circuit breaker.
    ///
    /// Network faults, timeouts, 5xx responses and 429s trip the breaker;
    /// other 4xx client errors do not.
    #[must_use]
    pub fn is_circuit_breaking(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } | Self::RateLimited { .. } => true,
            Self::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether a fallback chain should advance to the next link without any
    /// retry of the current one.
    #[must_use]
    pub fn yields_immediately(&self) -> bool {
        matches!(
            self,
            Self::DataNotAvailable { .. }
                | Self::IndicatorUnknown { .. }
                | Self::Unsupported { .. }
                | Self::CircuitOpen { .. }
        )
    }

    /// Coarse classification for progress events and HTTP mapping.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArg(_) | Self::Ambiguous { .. } => ErrorKind::Client,
            Self::Intent(_) => ErrorKind::Intent,
            Self::DataNotAvailable { .. }
            | Self::IndicatorUnknown { .. }
            | Self::Unsupported { .. } => ErrorKind::Resolution,
            Self::Timeout { .. } | Self::RequestTimeout { .. } => ErrorKind::Timeout,
            Self::Network { .. }
            | Self::Upstream { .. }
            | Self::RateLimited { .. }
            | Self::CircuitOpen { .. }
            | Self::Provider { .. } => ErrorKind::Upstream,
            Self::AllProvidersFailed(inner) => {
                // Surface the most specific member: timeouts win over generic
                // upstream noise, resolution-only failures stay 404.
                if inner.iter().all(|e| e.kind() == ErrorKind::Resolution) {
                    ErrorKind::Resolution
                } else if inner.iter().all(|e| e.kind() == ErrorKind::Timeout) {
                    ErrorKind::Timeout
                } else {
                    ErrorKind::Upstream
                }
            }
            Self::Data(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Provider this error is attributed to, when any.
    #[must_use]
    pub fn provider_name(&self) -> Option<&str> {
        match self {
            Self::Network { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::Upstream { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::CircuitOpen { provider, .. }
            | Self::Provider { provider, .. } => Some(provider),
            _ => None,
        }
    }

    /// Flatten nested `AllProvidersFailed` aggregates into a plain vector.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::AllProvidersFailed(list) => list.into_iter().flat_map(Self::flatten).collect(),
            other => vec![other],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaker_classification() {
        assert!(EconError::upstream("fred", 500, "boom").is_circuit_breaking());
        assert!(EconError::timeout("fred", "series").is_circuit_breaking());
        assert!(!EconError::upstream("fred", 404, "no such series").is_circuit_breaking());
        assert!(!EconError::InvalidArg("bad".into()).is_circuit_breaking());
    }

    #[test]
    fn aggregate_kind_prefers_resolution_when_uniform() {
        let err = EconError::AllProvidersFailed(vec![
            EconError::data_not_available("gdp for ATL"),
            EconError::IndicatorUnknown {
                label: "gdp".into(),
                suggestions: vec![],
            },
        ]);
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert_eq!(err.kind().status_code(), 404);
    }

    #[test]
    fn upstream_body_is_truncated() {
        let long = "x".repeat(1000);
        if let EconError::Upstream { body, .. } = EconError::upstream("oecd", 502, &long) {
            assert!(body.len() <= 260);
        } else {
            unreachable!();
        }
    }
}
