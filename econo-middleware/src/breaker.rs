//! Per-provider circuit breakers.
//!
//! One breaker per provider tag. A breaker in `open` state rejects calls
//! without upstream I/O; after the recovery timeout it admits a bounded
//! half-open trial and closes again on enough consecutive successes.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use econo_types::{BreakerConfig, EconError};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

/// Breaker phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerStateTag {
    /// Calls pass through.
    Closed,
    /// Calls fail fast.
    Open,
    /// A bounded trial is in progress.
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    phase: BreakerStateTag,
    failure_count: u32,
    success_count: u32,
    window_start: Instant,
    opened_at: Instant,
    half_open_in_flight: u32,
}

/// Serializable point-in-time view for `/health` and the router.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    /// Provider the breaker guards.
    pub provider: String,
    /// Current phase.
    pub state: BreakerStateTag,
    /// Failures in the current window.
    pub failure_count: u32,
    /// Consecutive half-open successes.
    pub success_count: u32,
}

/// Circuit breaker for one provider.
pub struct CircuitBreaker {
    provider: String,
    cfg: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    fn new(provider: &str, cfg: BreakerConfig) -> Self {
        let now = Instant::now();
        Self {
            provider: provider.to_string(),
            cfg,
            inner: Mutex::new(Inner {
                phase: BreakerStateTag::Closed,
                failure_count: 0,
                success_count: 0,
                window_start: now,
                opened_at: now,
                half_open_in_flight: 0,
            }),
        }
    }

    /// Admit or reject a call. On admission in half-open, the in-flight
    /// counter is incremented and must be released by `settle`.
    fn admit(&self) -> Result<(), EconError> {
        let mut s = self.inner.lock();
        let now = Instant::now();
        match s.phase {
            BreakerStateTag::Closed => {
                if now.duration_since(s.window_start) >= self.cfg.window {
                    s.window_start = now;
                    s.failure_count = 0;
                }
                Ok(())
            }
            BreakerStateTag::Open => {
                let elapsed = now.duration_since(s.opened_at);
                if elapsed >= self.cfg.recovery_timeout {
                    s.phase = BreakerStateTag::HalfOpen;
                    s.success_count = 0;
                    s.half_open_in_flight = 1;
                    info!(
                        target = "econo::breaker",
                        provider = %self.provider,
                        "open -> half_open, admitting trial call"
                    );
                    Ok(())
                } else {
                    let retry_in = self.cfg.recovery_timeout - elapsed;
                    Err(EconError::CircuitOpen {
                        provider: self.provider.clone(),
                        retry_in_ms: u64::try_from(retry_in.as_millis()).unwrap_or(u64::MAX),
                    })
                }
            }
            BreakerStateTag::HalfOpen => {
                if s.half_open_in_flight < self.cfg.half_open_max_calls {
                    s.half_open_in_flight += 1;
                    Ok(())
                } else {
                    Err(EconError::CircuitOpen {
                        provider: self.provider.clone(),
                        retry_in_ms: u64::try_from(self.cfg.recovery_timeout.as_millis())
                            .unwrap_or(u64::MAX),
                    })
                }
            }
        }
    }

    /// Record a call outcome and run state transitions.
    fn settle(&self, breaking_failure: bool) {
        let mut s = self.inner.lock();
        let now = Instant::now();
        if s.phase == BreakerStateTag::HalfOpen {
            s.half_open_in_flight = s.half_open_in_flight.saturating_sub(1);
        }
        if breaking_failure {
            match s.phase {
                BreakerStateTag::Closed => {
                    if now.duration_since(s.window_start) >= self.cfg.window {
                        s.window_start = now;
                        s.failure_count = 0;
                    }
                    s.failure_count += 1;
                    if s.failure_count >= self.cfg.failure_threshold {
                        s.phase = BreakerStateTag::Open;
                        s.opened_at = now;
                        warn!(
                            target = "econo::breaker",
                            provider = %self.provider,
                            failures = s.failure_count,
                            "closed -> open"
                        );
                    }
                }
                BreakerStateTag::HalfOpen | BreakerStateTag::Open => {
                    s.phase = BreakerStateTag::Open;
                    s.opened_at = now;
                    s.success_count = 0;
                }
            }
        } else {
            match s.phase {
                BreakerStateTag::HalfOpen => {
                    s.success_count += 1;
                    if s.success_count >= self.cfg.success_threshold {
                        s.phase = BreakerStateTag::Closed;
                        s.failure_count = 0;
                        s.success_count = 0;
                        s.window_start = now;
                        info!(
                            target = "econo::breaker",
                            provider = %self.provider,
                            "half_open -> closed"
                        );
                    }
                }
                BreakerStateTag::Closed | BreakerStateTag::Open => {}
            }
        }
    }

    /// Run `fut` under the breaker. Open state rejects without polling the
    /// future; outcomes are classified by
    /// [`EconError::is_circuit_breaking`]. A non-breaking error (e.g. a
    /// 404 or empty result) still proves the upstream is answering.
    ///
    /// # Errors
    /// `EconError::CircuitOpen` when rejected, otherwise the future's error.
    pub async fn call<T, Fut>(&self, fut: Fut) -> Result<T, EconError>
    where
        Fut: Future<Output = Result<T, EconError>>,
    {
        self.admit()?;
        match fut.await {
            Ok(v) => {
                self.settle(false);
                Ok(v)
            }
            Err(e) => {
                self.settle(e.is_circuit_breaking());
                Err(e)
            }
        }
    }

    /// Whether the breaker currently rejects calls (used by the router to
    /// skip a provider in the chain without attempting it).
    #[must_use]
    pub fn is_open(&self) -> bool {
        let s = self.inner.lock();
        s.phase == BreakerStateTag::Open
            && s.opened_at.elapsed() < self.cfg.recovery_timeout
    }

    /// Point-in-time view.
    #[must_use]
    pub fn snapshot(&self) -> BreakerSnapshot {
        let s = self.inner.lock();
        BreakerSnapshot {
            provider: self.provider.clone(),
            state: s.phase,
            failure_count: s.failure_count,
            success_count: s.success_count,
        }
    }

    /// Force the breaker open, as if the failure threshold had just been
    /// crossed. Exposed for fallback-chain tests and operational tooling.
    pub fn force_open(&self) {
        let mut s = self.inner.lock();
        s.phase = BreakerStateTag::Open;
        s.opened_at = Instant::now();
    }

    /// Recovery timeout the breaker was configured with.
    #[must_use]
    pub fn recovery_timeout(&self) -> Duration {
        self.cfg.recovery_timeout
    }
}

/// One breaker per provider tag, created lazily on first use.
pub struct BreakerRegistry {
    cfg: BreakerConfig,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    /// Build an empty registry; breakers share one configuration.
    #[must_use]
    pub fn new(cfg: BreakerConfig) -> Self {
        Self {
            cfg,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// The breaker for a provider, creating it on first use.
    #[must_use]
    pub fn for_provider(&self, provider: &str) -> Arc<CircuitBreaker> {
        let mut map = self.breakers.lock();
        Arc::clone(
            map.entry(provider.to_string())
                .or_insert_with(|| Arc::new(CircuitBreaker::new(provider, self.cfg))),
        )
    }

    /// Snapshots of every breaker created so far.
    #[must_use]
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let map = self.breakers.lock();
        let mut out: Vec<BreakerSnapshot> = map.values().map(|b| b.snapshot()).collect();
        out.sort_by(|a, b| a.provider.cmp(&b.provider));
        out
    }
}
