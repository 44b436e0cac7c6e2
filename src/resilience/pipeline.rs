//! Pipeline composing the resilience strategies around a transport.
//!
//! The composition order is fixed: breaker admission check first, then the
//! retry-wrapped transport call, with every attempt's outcome fed back into
//! the breaker's window. A rejection short-circuits before the retry layer,
//! so a circuit-open failure is never silently retried.

use crate::config::PipelineConfig;
use crate::errors::Error;
use crate::outcome::{Failure, Outcome};
use crate::resilience::circuit_breaker::{
    CircuitBreaker, CircuitBreakerHook, CircuitState, ManualControl,
};
use crate::resilience::retry::{RetryHook, RetryPolicy};
use crate::transport::{HttpRequest, Transport};
use std::sync::Arc;

/// Executes requests through retry and circuit-breaker strategies.
///
/// One pipeline owns one breaker; clones share it, so all concurrent callers
/// of a logical pipeline see the same circuit state. The handle itself is the
/// unit of ownership; there is no name-keyed global registry.
#[derive(Clone)]
pub struct ResiliencePipeline {
    name: String,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
}

impl ResiliencePipeline {
    /// Creates a pipeline from a validated configuration.
    pub fn new(config: PipelineConfig, transport: Arc<dyn Transport>) -> Result<Self, Error> {
        Self::builder(config, transport).build()
    }

    /// Creates a builder for attaching event hooks before construction.
    pub fn builder(config: PipelineConfig, transport: Arc<dyn Transport>) -> PipelineBuilder {
        PipelineBuilder {
            config,
            transport,
            retry_hook: None,
            breaker_hook: None,
        }
    }

    /// Executes one request through the full strategy stack.
    ///
    /// Exactly one terminal [`Outcome`] is returned per call: the successful
    /// response, the last classified failure once retries are exhausted, or a
    /// circuit-open rejection issued without touching the transport.
    pub async fn execute(&self, request: HttpRequest) -> Outcome {
        let permit = match self.breaker.try_acquire() {
            Ok(permit) => Arc::new(permit),
            Err(rejection) => return rejection.into(),
        };

        let transport = Arc::clone(&self.transport);
        let breaker = Arc::clone(&self.breaker);
        let result = self
            .retry
            .execute(|| {
                let request = request.clone();
                let transport = Arc::clone(&transport);
                let breaker = Arc::clone(&breaker);
                let permit = Arc::clone(&permit);
                async move {
                    let result = transport.send(request).await;
                    breaker.record(&permit, &result);
                    result
                }
            })
            .await;

        let classified_failure = self.retry.config().classifier.is_failure(&result);
        match (classified_failure, result) {
            (false, Ok(response)) => Outcome::Success(response),
            (true, Ok(response)) => Outcome::Failure(Failure::Response(response)),
            (_, Err(error)) => Outcome::Failure(Failure::Transport(error)),
        }
    }

    /// Read-only view of the circuit state.
    pub fn state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Operator handle for forcing the breaker open or closed.
    pub fn manual_control(&self) -> ManualControl {
        ManualControl::new(Arc::clone(&self.breaker))
    }

    /// The breaker shared by all clones of this pipeline.
    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// The logical pipeline name used in emitted events.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for configuring pipeline event hooks.
pub struct PipelineBuilder {
    config: PipelineConfig,
    transport: Arc<dyn Transport>,
    retry_hook: Option<Arc<dyn RetryHook>>,
    breaker_hook: Option<Arc<dyn CircuitBreakerHook>>,
}

impl PipelineBuilder {
    /// Attaches a retry observer.
    pub fn retry_hook(mut self, hook: Arc<dyn RetryHook>) -> Self {
        self.retry_hook = Some(hook);
        self
    }

    /// Attaches a breaker lifecycle hook.
    pub fn breaker_hook(mut self, hook: Arc<dyn CircuitBreakerHook>) -> Self {
        self.breaker_hook = Some(hook);
        self
    }

    /// Validates the configuration and builds the pipeline.
    pub fn build(self) -> Result<ResiliencePipeline, Error> {
        self.config.validate()?;

        let mut breaker = CircuitBreaker::new(self.config.name.clone(), self.config.breaker);
        if let Some(hook) = self.breaker_hook {
            breaker = breaker.with_hook(hook);
        }

        let mut retry = RetryPolicy::new(self.config.retry);
        if let Some(hook) = self.retry_hook {
            retry = retry.with_hook(hook);
        }

        Ok(ResiliencePipeline {
            name: self.config.name,
            transport: self.transport,
            retry,
            breaker: Arc::new(breaker),
        })
    }
}
