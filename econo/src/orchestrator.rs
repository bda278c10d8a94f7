//! The end-to-end query pipeline: resolve -> index-lookup -> route ->
//! fan-out fetch -> normalize -> cache, with step events emitted
//! throughout.

use std::sync::Arc;
use std::time::Duration;

use econo_core::connector::{EconConnector, SeriesQuery, TradeQuery};
use econo_core::series::ttl_class_for;
use econo_index::{IndicatorIndex, ScoredIndicator};
use econo_middleware::{BreakerRegistry, ResponseCache};
use econo_types::{
    EconError, GeoSelector, IndicatorRequest, NormalizedSeries, ParsedIntent, ProgressEvent,
    QueryResult, RequestFingerprint, TradeFlow, TtlClass, Warning,
};
use tracing::{debug, warn};

use crate::intent::IntentResolver;
use crate::progress::ProgressSink;
use crate::router::{RoutedChain, Router};

/// Providers whose data is streaming-intraday for cache TTL purposes.
const INTRADAY_PROVIDERS: &[&str] = &["coingecko", "exchangerate"];

/// How many index candidates are pulled per indicator label.
const CANDIDATE_LIMIT: usize = 8;

/// How many low-confidence candidates at most go through the LLM
/// validation pass.
const VALIDATION_LIMIT: usize = 3;

struct BranchOutcome {
    series: Vec<NormalizedSeries>,
    warnings: Vec<Warning>,
}

/// Carries producer warnings out of the single-flight closure; only the
/// caller that actually ran the producer observes them.
#[derive(Default)]
struct WarningCell(std::sync::Mutex<Vec<Warning>>);

impl WarningCell {
    fn store(&self, warnings: Vec<Warning>) {
        *self.0.lock().expect("warning cell poisoned") = warnings;
    }
    fn take(&self) -> Vec<Warning> {
        std::mem::take(&mut self.0.lock().expect("warning cell poisoned"))
    }
}

/// Composes the whole pipeline. Fan-out branches share the HTTP pool,
/// cache, breakers, and index; dropping the returned future cancels every
/// in-flight branch at its next suspension point.
pub struct Orchestrator {
    connectors: Vec<Arc<dyn EconConnector>>,
    router: Router,
    cache: Arc<ResponseCache>,
    breakers: Arc<BreakerRegistry>,
    index: Arc<IndicatorIndex>,
    resolver: Arc<IntentResolver>,
    budget: Duration,
}

impl Orchestrator {
    /// Assemble the pipeline from already-initialized parts (see
    /// `ServiceContext` for the canonical order).
    #[must_use]
    pub fn new(
        connectors: Vec<Arc<dyn EconConnector>>,
        router: Router,
        cache: Arc<ResponseCache>,
        breakers: Arc<BreakerRegistry>,
        index: Arc<IndicatorIndex>,
        resolver: Arc<IntentResolver>,
        budget: Duration,
    ) -> Self {
        Self {
            connectors,
            router,
            cache,
            breakers,
            index,
            resolver,
            budget,
        }
    }

    /// Registered provider names (for `/health`).
    #[must_use]
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.connectors.iter().map(|c| c.name()).collect()
    }

    /// Run one query end to end, emitting progress to `sink`. On success
    /// the final result is also emitted as a `data` event followed by
    /// `done`; on failure an `error` event precedes `done`.
    ///
    /// # Errors
    /// Total failure only when every branch failed; partial results come
    /// back as a success with warnings.
    pub async fn query(
        &self,
        query_text: &str,
        conversation_id: Option<&str>,
        sink: &ProgressSink,
    ) -> Result<QueryResult, EconError> {
        let outcome = match tokio::time::timeout(
            self.budget,
            self.run(query_text, conversation_id, sink),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(EconError::request_timeout("query")),
        };

        match &outcome {
            Ok(result) => {
                sink.emit(ProgressEvent::Data {
                    partial: None,
                    final_result: Some(result.clone()),
                })
                .await;
            }
            Err(e) => {
                sink.emit(ProgressEvent::Error {
                    kind: e.kind(),
                    message: e.to_string(),
                    provider: e.provider_name().map(str::to_string),
                })
                .await;
            }
        }
        sink.emit(ProgressEvent::Done).await;
        outcome
    }

    async fn run(
        &self,
        query_text: &str,
        conversation_id: Option<&str>,
        sink: &ProgressSink,
    ) -> Result<QueryResult, EconError> {
        // parse
        let stage = sink.stage_start("parse").await;
        let intent = self.resolver.resolve(query_text, conversation_id).await?;
        sink.stage_done(stage).await;
        let mut intent = intent;
        if intent.indicators.is_empty() {
            if intent.is_trade_query {
                intent.indicators.push(IndicatorRequest::new("trade balance"));
            } else {
                return Err(EconError::Ambiguous {
                    message: "could not identify an indicator in the query".into(),
                    suggestions: vec![
                        "US unemployment rate last 5 years".into(),
                        "compare GDP of US, China, Japan 2018-2023".into(),
                    ],
                });
            }
        }

        // index-lookup
        let stage = sink.stage_start("index-lookup").await;
        let mut candidates_per_indicator: Vec<Vec<ScoredIndicator>> = Vec::new();
        for indicator in &intent.indicators {
            candidates_per_indicator
                .push(self.validated_candidates(query_text, indicator).await?);
        }
        sink.stage_done(stage).await;

        // route
        let stage = sink.stage_start("route").await;
        let mut warnings: Vec<Warning> = Vec::new();
        let chains: Vec<RoutedChain> = intent
            .indicators
            .iter()
            .zip(&candidates_per_indicator)
            .map(|(indicator, candidates)| {
                self.router.plan(
                    &intent,
                    indicator,
                    candidates,
                    &self.connectors,
                    &self.breakers,
                )
            })
            .collect();
        for chain in &chains {
            for skipped in &chain.skipped {
                warnings.push(Warning::for_provider(
                    skipped.clone(),
                    format!("{skipped} skipped: circuit breaker open"),
                ));
            }
        }
        sink.stage_done(stage).await;

        // fetch (fan-out) + normalize
        let stage = sink.stage_start("fetch").await;
        let (data, mut branch_warnings, failures) =
            self.fan_out(&intent, &chains, &candidates_per_indicator, sink).await;
        sink.stage_done(stage).await;
        warnings.append(&mut branch_warnings);

        if data.is_empty() {
            let mut errors: Vec<EconError> =
                failures.into_iter().flat_map(EconError::flatten).collect();
            return Err(match errors.len() {
                0 => EconError::data_not_available(query_text),
                1 => errors.remove(0),
                _ => EconError::AllProvidersFailed(errors),
            });
        }
        for failure in failures {
            warnings.push(Warning {
                provider: failure.provider_name().map(str::to_string),
                indicator: None,
                message: failure.to_string(),
            });
        }

        // cache-store happened inside the shared fetch path; the step event
        // closes out the pipeline contract.
        let stage = sink.stage_start("cache-store").await;
        sink.stage_done(stage).await;

        Ok(QueryResult {
            intent,
            data,
            warnings,
        })
    }

    /// Index candidates with the semantic-validation pass applied:
    /// description-only matches must be confirmed by the LLM before they
    /// may lead the ranking.
    async fn validated_candidates(
        &self,
        query_text: &str,
        indicator: &IndicatorRequest,
    ) -> Result<Vec<ScoredIndicator>, EconError> {
        let mut candidates = self
            .index
            .search(&indicator.label, None, CANDIDATE_LIMIT)?;
        let mut checked = 0usize;
        let mut keep: Vec<ScoredIndicator> = Vec::with_capacity(candidates.len());
        for candidate in candidates.drain(..) {
            if candidate.low_confidence && checked < VALIDATION_LIMIT {
                checked += 1;
                let confirmed = self
                    .resolver
                    .validate_candidate(
                        query_text,
                        &candidate.record.display_name,
                        &candidate.record.description,
                    )
                    .await;
                if !confirmed {
                    debug!(
                        target = "econo::orchestrator",
                        code = %candidate.record.code,
                        "candidate rejected by semantic validation"
                    );
                    continue;
                }
            }
            keep.push(candidate);
        }
        Ok(keep)
    }

    /// Dispatch one branch per indicator x geography (a trade query is a
    /// single branch) and collect results in declared order.
    async fn fan_out(
        &self,
        intent: &ParsedIntent,
        chains: &[RoutedChain],
        candidates: &[Vec<ScoredIndicator>],
        sink: &ProgressSink,
    ) -> (Vec<NormalizedSeries>, Vec<Warning>, Vec<EconError>) {
        use futures::FutureExt;

        let mut branch_futures: Vec<
            futures::future::BoxFuture<'_, Result<BranchOutcome, EconError>>,
        > = Vec::new();

        if intent.is_trade_query {
            let chain = chains.first();
            branch_futures.push(self.trade_branch(intent, chain, sink).boxed());
        } else {
            let geos: Vec<GeoSelector> = if intent.geography.is_empty() {
                vec![GeoSelector::World]
            } else {
                intent.geography.clone()
            };
            for (i, indicator) in intent.indicators.iter().enumerate() {
                for geo in geos.clone() {
                    branch_futures.push(
                        self.series_branch(
                            intent,
                            indicator.clone(),
                            candidates.get(i),
                            geo,
                            &chains[i],
                            sink,
                        )
                        .boxed(),
                    );
                }
            }
        }

        // Branches run concurrently; join_all preserves declared order in
        // the output. No cross-branch ordering is promised while running.
        let outcomes = futures::future::join_all(branch_futures).await;

        let mut data = Vec::new();
        let mut warnings = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(BranchOutcome {
                    series,
                    warnings: mut w,
                }) => {
                    data.extend(series);
                    warnings.append(&mut w);
                }
                Err(e) => failures.push(e),
            }
        }
        (data, warnings, failures)
    }

    /// One series branch: walk the chain until a link succeeds, caching
    /// under the canonical request fingerprint with single-flight.
    async fn series_branch(
        &self,
        intent: &ParsedIntent,
        mut indicator: IndicatorRequest,
        candidates: Option<&Vec<ScoredIndicator>>,
        geo: GeoSelector,
        chain: &RoutedChain,
        sink: &ProgressSink,
    ) -> Result<BranchOutcome, EconError> {
        let mut errors: Vec<EconError> = Vec::new();

        for connector in &chain.chain {
            let name = connector.name();
            let Some(provider) = connector.as_series_provider() else {
                continue;
            };
            // Carry the index's resolved code for this provider when the
            // caller did not name one explicitly.
            if indicator.explicit_code.is_none() {
                if let Some(hit) = candidates
                    .into_iter()
                    .flatten()
                    .find(|c| c.record.provider == name && !c.low_confidence)
                {
                    indicator.explicit_code = Some(hit.record.code.clone());
                }
            }

            let query = SeriesQuery {
                indicator: indicator.clone(),
                geo: geo.clone(),
                range: intent.time_range.clone(),
                frequency: intent.frequency,
            };
            let fp = series_fingerprint(name, &query);
            let served_from_cache = self.cache.contains(&fp);
            let breaker = self.breakers.for_provider(name);

            let warnings = Arc::new(WarningCell::default());
            let producer_warnings = Arc::clone(&warnings);
            let result = self
                .cache
                .get_or_compute(fp, || async {
                    let response = call_with_retry_after(|| {
                        breaker.call(provider.fetch_series(&query))
                    })
                    .await?;
                    producer_warnings.store(response.warnings);
                    let class = ttl_class(name, &response.series);
                    Ok((response.series, class))
                })
                .await;

            match result {
                Ok(series) => {
                    if served_from_cache {
                        sink.cache_hit(&format!("fetch:{name}")).await;
                    } else {
                        for s in series.iter() {
                            sink.emit(ProgressEvent::Data {
                                partial: Some(s.clone()),
                                final_result: None,
                            })
                            .await;
                        }
                    }
                    return Ok(BranchOutcome {
                        series: series.as_ref().clone(),
                        warnings: warnings.take(),
                    });
                }
                Err(e) => {
                    if !e.yields_immediately() {
                        warn!(
                            target = "econo::orchestrator",
                            provider = name,
                            error = %e,
                            "chain link failed"
                        );
                    }
                    errors.push(e);
                }
            }
        }

        Err(match errors.len() {
            0 => EconError::unsupported("series"),
            1 => errors.remove(0),
            _ => EconError::AllProvidersFailed(errors),
        })
    }

    /// The single trade branch, derived from intent fields.
    async fn trade_branch(
        &self,
        intent: &ParsedIntent,
        chain: Option<&RoutedChain>,
        sink: &ProgressSink,
    ) -> Result<BranchOutcome, EconError> {
        let query = trade_query_from(intent)?;
        let mut errors: Vec<EconError> = Vec::new();

        let connectors: Vec<_> = chain.map(|c| c.chain.clone()).unwrap_or_default();
        for connector in &connectors {
            let name = connector.name();
            let Some(provider) = connector.as_trade_provider() else {
                continue;
            };
            let fp = trade_fingerprint(name, &query);
            let served_from_cache = self.cache.contains(&fp);
            let breaker = self.breakers.for_provider(name);

            let result = self
                .cache
                .get_or_compute(fp, || async {
                    let series = call_with_retry_after(|| {
                        breaker.call(provider.fetch_trade(&query))
                    })
                    .await?;
                    Ok((vec![series], TtlClass::Annual))
                })
                .await;

            match result {
                Ok(series) => {
                    if served_from_cache {
                        sink.cache_hit(&format!("fetch:{name}")).await;
                    }
                    return Ok(BranchOutcome {
                        series: series.as_ref().clone(),
                        warnings: Vec::new(),
                    });
                }
                Err(e) => errors.push(e),
            }
        }

        Err(match errors.len() {
            0 => EconError::unsupported("trade"),
            1 => errors.remove(0),
            _ => EconError::AllProvidersFailed(errors),
        })
    }
}

/// Honor a 429's retry-after hint once, then yield to the next link.
async fn call_with_retry_after<T, F, Fut>(mut call: F) -> Result<T, EconError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, EconError>>,
{
    match call().await {
        Err(EconError::RateLimited {
            retry_after_ms, ..
        }) => {
            let wait = retry_after_ms.unwrap_or(1_000).min(5_000);
            tokio::time::sleep(Duration::from_millis(wait)).await;
            call().await
        }
        other => other,
    }
}

fn ttl_class(provider: &str, series: &[NormalizedSeries]) -> TtlClass {
    let intraday = INTRADAY_PROVIDERS.contains(&provider);
    ttl_class_for(
        series.first().and_then(|s| s.metadata.frequency),
        intraday,
    )
}

/// Canonical fingerprint for a series branch. The synthetic URL goes
/// through the same normalization as real upstream URLs (sorted
/// parameters, no secrets), so equivalent branches collide.
fn series_fingerprint(provider: &str, query: &SeriesQuery) -> RequestFingerprint {
    let code = query
        .indicator
        .explicit_code
        .as_deref()
        .unwrap_or(&query.indicator.label);
    let mut qualifiers: Vec<String> = query
        .indicator
        .qualifiers
        .iter()
        .map(|q| format!("{q:?}").to_lowercase())
        .collect();
    qualifiers.sort();
    let url = format!(
        "econ://{provider}/series?code={code}&geo={}&start={}&end={}&freq={}&quals={}",
        query.geo.label(),
        query.range.start.as_deref().unwrap_or(""),
        query.range.end.as_deref().unwrap_or(""),
        query.frequency.map(|f| f.code()).unwrap_or(""),
        qualifiers.join("+"),
    );
    RequestFingerprint::from_url(&url)
}

fn trade_fingerprint(provider: &str, query: &TradeQuery) -> RequestFingerprint {
    let url = format!(
        "econ://{provider}/trade?reporter={}&partner={}&product={}&flow={:?}&start={}&end={}",
        query.reporter.label(),
        query.partner.as_ref().map(GeoSelector::label).unwrap_or_default(),
        query.product.to_lowercase(),
        query.flow,
        query.range.start.as_deref().unwrap_or(""),
        query.range.end.as_deref().unwrap_or(""),
    );
    RequestFingerprint::from_url(&url)
}

/// Derive the trade request from intent fields: first geography is the
/// reporter, second (when present) the partner, flow direction and product
/// from the indicator label.
fn trade_query_from(intent: &ParsedIntent) -> Result<TradeQuery, EconError> {
    let reporter = intent
        .geography
        .first()
        .cloned()
        .ok_or_else(|| EconError::InvalidArg("trade query without a reporter country".into()))?;
    let partner = intent.geography.get(1).cloned();

    let label = intent
        .indicators
        .first()
        .map(|i| i.label.to_lowercase())
        .unwrap_or_else(|| "trade balance".to_string());
    let flow = if label.contains("balance") {
        TradeFlow::Balance
    } else if label.contains("import") {
        TradeFlow::Imports
    } else if label.contains("export") {
        TradeFlow::Exports
    } else {
        TradeFlow::Balance
    };

    let product: String = label
        .split_whitespace()
        .filter(|w| {
            !matches!(
                *w,
                "trade" | "balance" | "imports" | "import" | "exports" | "export" | "of" | "in"
            )
        })
        .collect::<Vec<_>>()
        .join(" ");
    let product = if product.is_empty() {
        "total".to_string()
    } else {
        product
    };

    Ok(TradeQuery {
        reporter,
        partner,
        product,
        flow,
        range: intent.time_range.clone(),
    })
}

