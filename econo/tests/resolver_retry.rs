use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use econo::intent::{IntentResolver, LlmClient};
use econo_types::{EconError, GeoSelector};

/// Answers from a script, one entry per call.
struct SequencedLlm {
    answers: Vec<&'static str>,
    calls: AtomicUsize,
}

impl SequencedLlm {
    fn new(answers: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            answers,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LlmClient for SequencedLlm {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, EconError> {
        let i = self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .get(i)
            .map(|s| (*s).to_string())
            .ok_or_else(|| EconError::Intent("script exhausted".into()))
    }
}

const VALID: &str = r#"{"indicators": [{"label": "unemployment rate"}],
    "geography": [{"kind": "country", "value": "United States"}],
    "timeRange": {"relative": {"kind": "last_n_years", "n": 5}},
    "frequency": "monthly"}"#;

#[tokio::test]
async fn parse_failure_retries_once_then_succeeds() {
    let llm = SequencedLlm::new(vec!["Sure! Here's your intent:", VALID]);
    let resolver = IntentResolver::new(Some(llm.clone() as _));

    let intent = resolver
        .resolve("US unemployment rate last 5 years", None)
        .await
        .unwrap();
    assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    assert_eq!(intent.indicators[0].label, "unemployment rate");
    // The post-processor already ran: names became ISO3, relative ranges
    // became absolute dates.
    assert_eq!(intent.geography[0], GeoSelector::Country("USA".into()));
    assert!(intent.time_range.relative.is_none());
    assert!(intent.time_range.start.is_some());
}

#[tokio::test]
async fn double_parse_failure_is_an_intent_error() {
    let llm = SequencedLlm::new(vec!["not json", "still not json"]);
    let resolver = IntentResolver::new(Some(llm as _));

    let err = resolver.resolve("gdp of France", None).await.unwrap_err();
    assert!(matches!(err, EconError::Intent(_)));
    assert_eq!(err.kind().status_code(), 503);
}

#[tokio::test]
async fn identical_queries_hit_the_intent_cache() {
    let llm = SequencedLlm::new(vec![VALID]);
    let resolver = IntentResolver::new(Some(llm.clone() as _));

    let first = resolver.resolve("US unemployment rate", None).await.unwrap();
    let second = resolver.resolve("US unemployment rate", None).await.unwrap();
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1, "second call must be cached");
    assert_eq!(first, second);
}

#[tokio::test]
async fn conversation_tail_separates_cache_entries() {
    let llm = SequencedLlm::new(vec![VALID, VALID]);
    let resolver = IntentResolver::new(Some(llm.clone() as _));

    resolver.resolve("same words", Some("tail-a")).await.unwrap();
    resolver.resolve("same words", Some("tail-b")).await.unwrap();
    assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn missing_backend_is_service_unavailable() {
    let resolver = IntentResolver::new(None);
    let err = resolver.resolve("gdp of France", None).await.unwrap_err();
    assert!(matches!(err, EconError::Intent(_)));
}

#[tokio::test]
async fn semantic_validation_rejects_on_no() {
    struct NoLlm;
    #[async_trait]
    impl LlmClient for NoLlm {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, EconError> {
            Ok("no".to_string())
        }
    }
    let resolver = IntentResolver::new(Some(Arc::new(NoLlm)));
    let confirmed = resolver
        .validate_candidate(
            "productivity growth",
            "Crop production index",
            "Agricultural production relative to the base period.",
        )
        .await;
    assert!(!confirmed);
}

#[tokio::test]
async fn semantic_validation_fails_open_without_backend() {
    let resolver = IntentResolver::new(None);
    assert!(resolver.validate_candidate("q", "name", "desc").await);
}
