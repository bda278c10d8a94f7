//! Bounded progress channel between the pipeline and the SSE handler.

use std::time::Instant;

use econo_types::{ProgressEvent, StepStatus};
use tokio::sync::mpsc;

/// A started pipeline stage; hand back to [`ProgressSink::stage_done`] to
/// emit the completion event with its duration.
pub struct Stage {
    name: &'static str,
    started: Instant,
}

/// Writer half of the progress channel.
///
/// The channel is bounded: a slow consumer backpressures the producer
/// instead of buffering unboundedly. A disabled sink (non-streaming
/// requests) drops events without cost. A closed receiver is treated as a
/// disconnected caller; emission becomes a no-op and the orchestrator's
/// cancellation handling takes over.
#[derive(Clone)]
pub struct ProgressSink {
    tx: Option<mpsc::Sender<ProgressEvent>>,
}

impl ProgressSink {
    /// A sink/receiver pair with the given buffer capacity.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that swallows every event (non-streaming requests).
    #[must_use]
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Emit one event, awaiting channel capacity when streaming.
    pub async fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event).await;
        }
    }

    /// Emit a stage-started event and return the running stage.
    pub async fn stage_start(&self, name: &'static str) -> Stage {
        self.emit(ProgressEvent::step_started(name)).await;
        Stage {
            name,
            started: Instant::now(),
        }
    }

    /// Emit the completion event for a stage.
    pub async fn stage_done(&self, stage: Stage) {
        let duration_ms = u64::try_from(stage.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.emit(ProgressEvent::step_completed(stage.name, duration_ms))
            .await;
    }

    /// Emit a cache-hit step for a fetch branch served without upstream
    /// I/O.
    pub async fn cache_hit(&self, name: &str) {
        self.emit(ProgressEvent::Step {
            name: name.to_string(),
            status: StepStatus::CacheHit,
            duration_ms: Some(0),
        })
        .await;
    }
}
