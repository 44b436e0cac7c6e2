//! # Resilient HTTP
//!
//! Resilience pipeline for outbound HTTP calls, composing two fault-tolerance
//! strategies around a pluggable transport:
//!
//! - **Retry** with constant/linear/exponential backoff and jitter
//! - **Circuit breaker** with a rolling failure-ratio window, adaptive break
//!   durations from `Retry-After` hints, half-open probing, and manual
//!   isolation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resilient_http::{HttpRequest, PipelineConfig, ReqwestTransport, ResiliencePipeline};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(30))?);
//!     let pipeline = ResiliencePipeline::new(PipelineConfig::new("upstream"), transport)?;
//!
//!     let outcome = pipeline
//!         .execute(HttpRequest::get("https://upstream.example/api/health")?)
//!         .await;
//!
//!     if let Some(response) = outcome.response() {
//!         println!("status: {}", response.status);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - `config` - Pipeline configuration and environment overrides
//! - `errors` - Error taxonomy
//! - `outcome` - Call outcomes and per-layer classifiers
//! - `transport` - HTTP transport seam and the reqwest implementation
//! - `resilience` - Retry, circuit breaker, rolling window, break durations,
//!   and the pipeline composing them
//! - `observability` - Structured logging setup
//! - `mocks` - Mock transport for testing

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod config;
pub mod errors;
pub mod observability;
pub mod outcome;
pub mod resilience;
pub mod transport;

// Development/testing modules
#[cfg(test)]
pub mod mocks;

// Re-exports for convenience
pub use config::PipelineConfig;
pub use errors::{CircuitOpenRejection, Error, Result};
pub use observability::{LogFormat, LogLevel, LoggingConfig};
pub use outcome::{CallResult, Failure, Outcome, OutcomeClassifier, Verdict};
pub use resilience::{
    from_retry_after, retry_after_hint, BackoffKind, BreakContext, BreakDurationGenerator,
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerHook, CircuitBreakerStats, CircuitState,
    ManualControl, PipelineBuilder, ResiliencePipeline, RetryConfig, RetryHook, RetryPolicy,
};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

use std::time::Duration;

/// The default maximum number of retries after the initial attempt.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// The default base delay the backoff schedule grows from.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// The default upper bound on any computed backoff delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// The default failure ratio at which the circuit opens.
pub const DEFAULT_FAILURE_RATIO: f64 = 0.1;

/// The default rolling window length.
pub const DEFAULT_SAMPLING_DURATION: Duration = Duration::from_secs(30);

/// The default minimum samples before the failure ratio is acted on.
pub const DEFAULT_MINIMUM_THROUGHPUT: u64 = 100;

/// The default break duration while the circuit is open.
pub const DEFAULT_BREAK_DURATION: Duration = Duration::from_secs(5);
