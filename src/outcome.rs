//! Call outcomes and the predicates that classify them.
//!
//! A raw call result (`Result<HttpResponse, Error>`) is turned into a
//! success/failure verdict by an [`OutcomeClassifier`]. The retry layer and the
//! circuit breaker each hold their own classifier: one layer may treat any
//! non-2xx response as a failure while the other only reacts to 503/429.

use crate::errors::{CircuitOpenRejection, Error};
use crate::transport::HttpResponse;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Raw result of a single transport invocation.
pub type CallResult = std::result::Result<HttpResponse, Error>;

/// Verdict produced by classifying a raw call result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The result counts as a success for the owning strategy layer.
    Success,
    /// The result counts as a failure for the owning strategy layer.
    Failure,
}

/// Predicate turning a raw call result into a [`Verdict`].
///
/// `true` from the predicate means *failure* (the strategy should handle the
/// result). Classifiers have no side effects and are cheap to clone.
#[derive(Clone)]
pub struct OutcomeClassifier {
    predicate: Arc<dyn Fn(&CallResult) -> bool + Send + Sync>,
}

impl OutcomeClassifier {
    /// Creates a classifier from an arbitrary predicate.
    ///
    /// The predicate returns `true` when the result should be treated as a
    /// failure.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&CallResult) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Classifier treating transport errors and any non-2xx status as failure.
    pub fn non_success() -> Self {
        Self::new(|result| match result {
            Ok(response) => !(200..300).contains(&response.status),
            Err(_) => true,
        })
    }

    /// Classifier treating transport errors and the listed statuses as failure.
    pub fn statuses(codes: &[u16]) -> Self {
        let codes = codes.to_vec();
        Self::new(move |result| match result {
            Ok(response) => codes.contains(&response.status),
            Err(_) => true,
        })
    }

    /// Classifies a raw call result.
    pub fn classify(&self, result: &CallResult) -> Verdict {
        if (self.predicate)(result) {
            Verdict::Failure
        } else {
            Verdict::Success
        }
    }

    /// Shorthand for `classify(result) == Verdict::Failure`.
    pub fn is_failure(&self, result: &CallResult) -> bool {
        (self.predicate)(result)
    }
}

impl fmt::Debug for OutcomeClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OutcomeClassifier")
    }
}

/// Terminal result of a pipeline execution.
///
/// Exactly one `Outcome` is returned per [`execute`] call: a success, the last
/// classified failure after retries were exhausted, or a circuit-open
/// rejection. A rejection is never silently retried.
///
/// [`execute`]: crate::resilience::ResiliencePipeline::execute
#[derive(Debug)]
pub enum Outcome {
    /// The call succeeded per the retry layer's classifier.
    Success(HttpResponse),
    /// The call terminally failed.
    Failure(Failure),
}

/// The ways a pipeline execution can terminally fail.
#[derive(Debug)]
pub enum Failure {
    /// A response the classifier marked as a failure (e.g. a 503 that
    /// survived all retry attempts).
    Response(HttpResponse),
    /// A transport-level error, propagated unchanged through classification.
    Transport(Error),
    /// Short-circuited by the breaker while `Open` or `Isolated`; the
    /// transport was never invoked.
    CircuitOpen {
        /// Remaining break time, if the circuit will recover on its own.
        retry_after: Option<Duration>,
    },
}

impl Outcome {
    /// Returns `true` for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Returns `true` when the call was rejected by the breaker.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Outcome::Failure(Failure::CircuitOpen { .. }))
    }

    /// The response carried by this outcome, successful or not.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            Outcome::Success(response) | Outcome::Failure(Failure::Response(response)) => {
                Some(response)
            }
            _ => None,
        }
    }

    /// Consumes the outcome, returning the carried response if any.
    pub fn into_response(self) -> Option<HttpResponse> {
        match self {
            Outcome::Success(response) | Outcome::Failure(Failure::Response(response)) => {
                Some(response)
            }
            _ => None,
        }
    }
}

impl From<CircuitOpenRejection> for Outcome {
    fn from(rejection: CircuitOpenRejection) -> Self {
        Outcome::Failure(Failure::CircuitOpen {
            retry_after: rejection.retry_after,
        })
    }
}
