//! Process-local middleware for the econo query engine: the keyed response
//! cache and the per-provider circuit-breaker registry.
#![warn(missing_docs)]

mod breaker;
mod cache;

pub use breaker::{BreakerRegistry, BreakerSnapshot, BreakerStateTag, CircuitBreaker};
pub use cache::{CacheStats, ResponseCache};
