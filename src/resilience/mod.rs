//! Resilience strategies and their composition.
//!
//! The pipeline composes the strategies in a fixed order: circuit breaker
//! admission first, then the retry-wrapped transport call, with every
//! attempt's classified outcome fed back into the breaker's rolling window.

mod break_duration;
mod circuit_breaker;
mod pipeline;
mod retry;
mod window;


pub use break_duration::{
    from_retry_after, retry_after_hint, BreakContext, BreakDurationGenerator,
};
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerHook, CircuitBreakerStats, CircuitState,
    ManualControl, Permit,
};
pub use pipeline::{PipelineBuilder, ResiliencePipeline};
pub use retry::{BackoffKind, RetryConfig, RetryHook, RetryPolicy, JITTER_MAX, JITTER_MIN};
pub use window::RollingWindow;
