//! Configuration for resilience pipelines

use crate::errors::Error;
use crate::resilience::{CircuitBreakerConfig, RetryConfig};
use std::time::Duration;

/// Configuration for a [`ResiliencePipeline`].
///
/// [`ResiliencePipeline`]: crate::resilience::ResiliencePipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Logical pipeline name, carried on every emitted event.
    pub name: String,

    /// Retry layer configuration.
    pub retry: RetryConfig,

    /// Circuit breaker configuration.
    pub breaker: CircuitBreakerConfig,
}

impl PipelineConfig {
    /// Creates a configuration with default strategy settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            retry: RetryConfig::default(),
            breaker: CircuitBreakerConfig::default(),
        }
    }

    /// Creates a configuration, overriding defaults from environment
    /// variables where present:
    ///
    /// - `RESILIENT_HTTP_MAX_ATTEMPTS`
    /// - `RESILIENT_HTTP_BASE_DELAY_MS`
    /// - `RESILIENT_HTTP_MAX_DELAY_MS`
    /// - `RESILIENT_HTTP_FAILURE_RATIO`
    /// - `RESILIENT_HTTP_SAMPLING_DURATION_SECS`
    /// - `RESILIENT_HTTP_MINIMUM_THROUGHPUT`
    /// - `RESILIENT_HTTP_BREAK_DURATION_SECS`
    pub fn from_env(name: impl Into<String>) -> Self {
        let mut config = Self::new(name);

        if let Ok(value) = std::env::var("RESILIENT_HTTP_MAX_ATTEMPTS") {
            if let Ok(attempts) = value.parse() {
                config.retry.max_attempts = attempts;
            }
        }

        if let Ok(value) = std::env::var("RESILIENT_HTTP_BASE_DELAY_MS") {
            if let Ok(millis) = value.parse() {
                config.retry.base_delay = Duration::from_millis(millis);
            }
        }

        if let Ok(value) = std::env::var("RESILIENT_HTTP_MAX_DELAY_MS") {
            if let Ok(millis) = value.parse() {
                config.retry.max_delay = Duration::from_millis(millis);
            }
        }

        if let Ok(value) = std::env::var("RESILIENT_HTTP_FAILURE_RATIO") {
            if let Ok(ratio) = value.parse() {
                config.breaker.failure_ratio = ratio;
            }
        }

        if let Ok(value) = std::env::var("RESILIENT_HTTP_SAMPLING_DURATION_SECS") {
            if let Ok(secs) = value.parse() {
                config.breaker.sampling_duration = Duration::from_secs(secs);
            }
        }

        if let Ok(value) = std::env::var("RESILIENT_HTTP_MINIMUM_THROUGHPUT") {
            if let Ok(throughput) = value.parse() {
                config.breaker.minimum_throughput = throughput;
            }
        }

        if let Ok(value) = std::env::var("RESILIENT_HTTP_BREAK_DURATION_SECS") {
            if let Ok(secs) = value.parse() {
                config.breaker.break_duration = Duration::from_secs(secs);
            }
        }

        config
    }

    /// Replaces the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the breaker configuration.
    pub fn with_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    /// Checks configured values against their valid ranges.
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.is_empty() {
            return Err(Error::configuration("Pipeline name must not be empty"));
        }
        if !(self.breaker.failure_ratio > 0.0 && self.breaker.failure_ratio <= 1.0) {
            return Err(Error::configuration(
                "failure_ratio must be within (0, 1]",
            ));
        }
        if self.breaker.sampling_duration.is_zero() {
            return Err(Error::configuration("sampling_duration must be non-zero"));
        }
        if self.breaker.minimum_throughput == 0 {
            return Err(Error::configuration(
                "minimum_throughput must be at least 1",
            ));
        }
        Ok(())
    }
}
