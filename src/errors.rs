//! Error types for the resilience layer

use std::time::Duration;
use thiserror::Error;

/// Result type alias for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Transport-level and configuration errors.
///
/// Classified failures (a response the caller's predicate marked as a failure)
/// are deliberately *not* errors: they travel as [`crate::Failure::Response`]
/// outcomes and feed the retry and circuit-breaker bookkeeping instead.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Configuration error (invalid URL, malformed settings, etc.)
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// The underlying call exceeded its deadline.
    #[error("Request timeout: {message}")]
    Timeout {
        /// Description of the timeout.
        message: String,
    },

    /// Network/connection error.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
    },

    /// Unexpected internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl Error {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout {
                message: err.to_string(),
            }
        } else if err.is_connect() || err.is_request() {
            Error::Connection {
                message: err.to_string(),
            }
        } else {
            Error::Internal {
                message: err.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Configuration {
            message: format!("Invalid URL: {}", err),
        }
    }
}

/// Rejection issued by the circuit breaker without touching the transport.
///
/// Carries no transport-level information beyond the time remaining until the
/// breaker schedules its next half-open probe (`None` while isolated).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitOpenRejection {
    /// Remaining break time, if the circuit will recover on its own.
    pub retry_after: Option<Duration>,
}
