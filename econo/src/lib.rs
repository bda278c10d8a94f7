//! The econo query pipeline: intent resolution, provider routing, fan-out
//! fetching, and progress streaming, composed behind a [`ServiceContext`].
#![warn(missing_docs)]

mod context;
pub mod intent;
mod orchestrator;
mod progress;
mod router;

pub use context::ServiceContext;
pub use intent::{HttpLlmClient, IntentResolver, LlmClient};
pub use orchestrator::Orchestrator;
pub use progress::ProgressSink;
pub use router::{Router, LOW_PRIORITY_PROVIDER};

pub use econo_types::{
    EconConfig, EconError, ParsedIntent, ProgressEvent, QueryResult, StepStatus, Warning,
};
