use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use econo_middleware::{BreakerRegistry, BreakerStateTag};
use econo_types::{BreakerConfig, EconError};

fn cfg() -> BreakerConfig {
    BreakerConfig {
        failure_threshold: 3,
        success_threshold: 2,
        window: Duration::from_secs(60),
        recovery_timeout: Duration::from_millis(50),
        half_open_max_calls: 1,
    }
}

fn upstream_500() -> EconError {
    EconError::upstream("oecd", 500, "boom")
}

#[tokio::test]
async fn opens_after_failure_threshold_and_fails_fast() {
    let registry = BreakerRegistry::new(cfg());
    let breaker = registry.for_provider("oecd");
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let calls = Arc::clone(&calls);
        let _ = breaker
            .call(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(upstream_500())
            })
            .await;
    }
    assert_eq!(breaker.snapshot().state, BreakerStateTag::Open);

    // Open state rejects without polling the future.
    let calls_clone = Arc::clone(&calls);
    let err = breaker
        .call(async move {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok::<_, EconError>(())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EconError::CircuitOpen { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 3, "no upstream I/O while open");
}

#[tokio::test]
async fn recovers_through_half_open() {
    let registry = BreakerRegistry::new(cfg());
    let breaker = registry.for_provider("oecd");
    breaker.force_open();

    tokio::time::sleep(Duration::from_millis(60)).await;

    // Two consecutive successes close the breaker.
    for _ in 0..2 {
        breaker.call(async { Ok::<_, EconError>(()) }).await.unwrap();
    }
    assert_eq!(breaker.snapshot().state, BreakerStateTag::Closed);
}

#[tokio::test]
async fn half_open_failure_reopens() {
    let registry = BreakerRegistry::new(cfg());
    let breaker = registry.for_provider("bis");
    breaker.force_open();
    tokio::time::sleep(Duration::from_millis(60)).await;

    let _ = breaker
        .call(async { Err::<(), _>(upstream_500()) })
        .await;
    assert_eq!(breaker.snapshot().state, BreakerStateTag::Open);
    assert!(breaker.is_open());
}

#[tokio::test]
async fn client_errors_do_not_trip_the_breaker() {
    let registry = BreakerRegistry::new(cfg());
    let breaker = registry.for_provider("fred");

    for _ in 0..10 {
        let _ = breaker
            .call(async {
                Err::<(), _>(EconError::upstream("fred", 404, "no such series"))
            })
            .await;
    }
    assert_eq!(breaker.snapshot().state, BreakerStateTag::Closed);
}

#[tokio::test]
async fn rate_limit_429_counts_as_breaking() {
    let registry = BreakerRegistry::new(cfg());
    let breaker = registry.for_provider("comtrade");

    for _ in 0..3 {
        let _ = breaker
            .call(async {
                Err::<(), _>(EconError::RateLimited {
                    provider: "comtrade".into(),
                    retry_after_ms: Some(1000),
                })
            })
            .await;
    }
    assert_eq!(breaker.snapshot().state, BreakerStateTag::Open);
}

#[tokio::test]
async fn registry_isolates_providers() {
    let registry = BreakerRegistry::new(cfg());
    registry.for_provider("oecd").force_open();
    assert!(registry.for_provider("oecd").is_open());
    assert!(!registry.for_provider("fred").is_open());
    assert_eq!(registry.snapshots().len(), 2);
}
