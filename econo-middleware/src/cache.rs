//! Fingerprint-keyed response cache with TTL-by-frequency-class, LRU
//! eviction, and single-flight semantics.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use econo_types::{CacheConfig, EconError, NormalizedSeries, RequestFingerprint, TtlClass};
use moka::future::Cache;
use moka::Expiry;
use serde::Serialize;
use tracing::{debug, info};

/// Immutable cached value; refresh replaces the entry, never mutates it.
#[derive(Clone)]
struct Entry {
    result: Arc<Vec<NormalizedSeries>>,
    class: TtlClass,
}

/// Per-entry TTL driven by the frequency class of the cached result.
struct ClassExpiry {
    ttl_by_class: std::collections::HashMap<TtlClass, Duration>,
}

impl Expiry<RequestFingerprint, Entry> for ClassExpiry {
    fn expire_after_create(
        &self,
        _key: &RequestFingerprint,
        value: &Entry,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(
            self.ttl_by_class
                .get(&value.class)
                .copied()
                .unwrap_or(Duration::from_secs(3600)),
        )
    }
}

/// Counters surfaced by `GET /cache/stats`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    /// Live entries.
    pub entries: u64,
    /// Lookups answered from cache.
    pub hits: u64,
    /// Lookups that invoked the producer.
    pub misses: u64,
    /// Hit rate in percent, rounded down; 0 when no lookups happened.
    pub hit_rate: u64,
    /// Entries dropped by LRU pressure or TTL expiry.
    pub evictions: u64,
}

/// Process-local response cache keyed by [`RequestFingerprint`].
///
/// Single-flight: concurrent lookups for the same fingerprint observe one
/// in-progress producer and share its result. Producer errors are never
/// cached, so a failed branch stays retryable across the fallback chain.
pub struct ResponseCache {
    inner: Cache<RequestFingerprint, Entry>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: Arc<AtomicU64>,
    sweeper: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ResponseCache {
    /// Build the cache and start its background sweep task.
    ///
    /// The sweeper only advances moka's internal maintenance so expired
    /// entries are dropped on schedule rather than lazily at the next
    /// touch; correctness does not depend on it.
    #[must_use]
    pub fn new(cfg: &CacheConfig) -> Arc<Self> {
        let evictions = Arc::new(AtomicU64::new(0));
        let eviction_counter = Arc::clone(&evictions);
        let inner: Cache<RequestFingerprint, Entry> = Cache::builder()
            .max_capacity(cfg.max_entries)
            .expire_after(ClassExpiry {
                ttl_by_class: cfg.ttl_by_class.clone(),
            })
            .eviction_listener(move |_key, _value, _cause| {
                eviction_counter.fetch_add(1, Ordering::Relaxed);
            })
            .build();

        info!(
            target = "econo::cache",
            event = "init",
            max_entries = cfg.max_entries,
            sweep_interval_ms = u64::try_from(cfg.sweep_interval.as_millis()).unwrap_or(u64::MAX),
            "response cache initialized"
        );

        let cache = Arc::new(Self {
            inner,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions,
            sweeper: parking_lot::Mutex::new(None),
        });

        let sweep_target = Arc::downgrade(&cache);
        let interval = cfg.sweep_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(cache) = sweep_target.upgrade() else {
                    break;
                };
                cache.inner.run_pending_tasks().await;
            }
        });
        *cache.sweeper.lock() = Some(handle);
        cache
    }

    /// Look up `fp`, or run `producer` exactly once across all concurrent
    /// callers and cache its result under the TTL class it reports.
    ///
    /// # Errors
    /// Propagates the producer's error to every waiter; nothing is cached
    /// on failure.
    pub async fn get_or_compute<F, Fut>(
        &self,
        fp: RequestFingerprint,
        producer: F,
    ) -> Result<Arc<Vec<NormalizedSeries>>, EconError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(Vec<NormalizedSeries>, TtlClass), EconError>>,
    {
        let did_load = Arc::new(AtomicBool::new(false));
        let loaded_flag = Arc::clone(&did_load);

        let entry = self
            .inner
            .try_get_with(fp.clone(), async move {
                loaded_flag.store(true, Ordering::Relaxed);
                let (result, class) = producer().await?;
                Ok::<_, EconError>(Entry {
                    result: Arc::new(result),
                    class,
                })
            })
            .await
            .map_err(|err: Arc<EconError>| (*err).clone())?;

        if did_load.load(Ordering::Relaxed) {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(target = "econo::cache", event = "insert", fingerprint = %fp, "miss -> computed and inserted");
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(target = "econo::cache", event = "hit", fingerprint = %fp, "cache hit");
        }
        Ok(entry.result)
    }

    /// Whether `fp` is currently cached, without touching LRU order or
    /// invoking any producer.
    #[must_use]
    pub fn contains(&self, fp: &RequestFingerprint) -> bool {
        self.inner.contains_key(fp)
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }

    /// Current counters.
    pub async fn stats(&self) -> CacheStats {
        self.inner.run_pending_tasks().await;
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        CacheStats {
            entries: self.inner.entry_count(),
            hits,
            misses,
            hit_rate: if lookups == 0 { 0 } else { hits * 100 / lookups },
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Stop the background sweeper. Entries stay readable; expiry falls
    /// back to lazy maintenance.
    pub fn close(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for ResponseCache {
    fn drop(&mut self) {
        self.close();
    }
}
