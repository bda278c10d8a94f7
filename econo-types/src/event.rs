//! Typed progress events streamed over the SSE channel.

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::series::{NormalizedSeries, QueryResult, Warning};

/// Outcome of a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The stage has begun.
    Started,
    /// The stage finished successfully.
    Completed,
    /// The branch was served from cache without upstream I/O.
    CacheHit,
    /// The stage failed (an `error` event follows or the stage recovered).
    Failed,
}

/// Closed set of events emitted by the orchestrator pipeline.
///
/// Clients must tolerate unknown future event names; `done` terminates the
/// stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event", content = "payload")]
pub enum ProgressEvent {
    /// A pipeline stage changed state.
    Step {
        /// Stage name (`parse`, `index-lookup`, `route`, `fetch`,
        /// `normalize`, `cache-store`).
        name: String,
        /// New state.
        status: StepStatus,
        /// Stage duration, present on completion.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },
    /// A data payload. Partial payloads carry a single branch's series;
    /// the final payload carries the assembled result.
    Data {
        /// One branch's series, streamed as it completes.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        partial: Option<NormalizedSeries>,
        /// The assembled result, sent once before `done`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        final_result: Option<QueryResult>,
    },
    /// A non-fatal problem.
    Warning(Warning),
    /// A fatal problem for one branch or the whole request.
    Error {
        /// Coarse classification.
        kind: ErrorKind,
        /// Human-readable message.
        message: String,
        /// Provider attribution, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider: Option<String>,
    },
    /// Terminates the stream.
    Done,
}

impl ProgressEvent {
    /// SSE event name for this variant.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Step { .. } => "step",
            Self::Data { .. } => "data",
            Self::Warning(_) => "warning",
            Self::Error { .. } => "error",
            Self::Done => "done",
        }
    }

    /// Shorthand for a stage-started event.
    pub fn step_started(name: impl Into<String>) -> Self {
        Self::Step {
            name: name.into(),
            status: StepStatus::Started,
            duration_ms: None,
        }
    }

    /// Shorthand for a stage-completed event with its duration.
    pub fn step_completed(name: impl Into<String>, duration_ms: u64) -> Self {
        Self::Step {
            name: name.into(),
            status: StepStatus::Completed,
            duration_ms: Some(duration_ms),
        }
    }
}
