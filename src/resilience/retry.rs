use crate::outcome::{CallResult, OutcomeClassifier};
use crate::{
    DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Lower bound of the multiplicative jitter band.
pub const JITTER_MIN: f64 = 0.8;
/// Upper bound of the multiplicative jitter band.
pub const JITTER_MAX: f64 = 1.2;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffKind {
    /// Every retry waits `base_delay`.
    Constant,
    /// Retry `n` waits `base_delay * n`.
    Linear,
    /// Retry `n` waits `base_delay * 2^(n-1)`.
    Exponential,
}

/// Configuration for retry behavior
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_attempts: u32,
    /// Base delay the backoff schedule grows from.
    pub base_delay: Duration,
    /// Upper bound on any computed delay.
    pub max_delay: Duration,
    /// Backoff schedule.
    pub backoff: BackoffKind,
    /// Whether to perturb each delay within the jitter band.
    ///
    /// Jitter spreads retries of concurrent callers so a shared dependency's
    /// recovery is not met by a synchronized storm.
    pub use_jitter: bool,
    /// Predicate deciding which results this layer retries.
    pub classifier: OutcomeClassifier,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff: BackoffKind::Exponential,
            use_jitter: true,
            classifier: OutcomeClassifier::non_success(),
        }
    }
}

impl RetryConfig {
    /// Configuration that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }
}

/// Observer notified after each retry decision.
///
/// Invoked once per retry with the attempt number and the computed delay,
/// after the decision is already committed; implementations cannot veto or
/// reorder anything and must not block.
pub trait RetryHook: Send + Sync {
    /// Called before the backoff sleep for retry `attempt`.
    fn on_retry(&self, attempt: u32, delay: Duration);
}

/// Retries a failing call according to a [`RetryConfig`].
#[derive(Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    hook: Option<Arc<dyn RetryHook>>,
}

impl RetryPolicy {
    /// Creates a policy with the given configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config, hook: None }
    }

    /// Attaches a retry observer.
    pub fn with_hook(mut self, hook: Arc<dyn RetryHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Returns the retry configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Executes `call`, retrying classified failures until success or
    /// exhaustion.
    ///
    /// Returns the first successful result, or the last failing one once
    /// `max_attempts` retries have been spent. The backoff wait suspends the
    /// task, never an OS thread.
    pub async fn execute<F, Fut>(&self, call: F) -> CallResult
    where
        F: Fn() -> Fut + Send,
        Fut: Future<Output = CallResult> + Send,
    {
        let mut attempt = 0;

        loop {
            let result = call().await;

            if !self.config.classifier.is_failure(&result) {
                if attempt > 0 {
                    tracing::info!(attempt, "call succeeded after retries");
                }
                return result;
            }

            if attempt >= self.config.max_attempts {
                if self.config.max_attempts > 0 {
                    tracing::warn!(
                        max_attempts = self.config.max_attempts,
                        "retries exhausted, returning last failure"
                    );
                }
                return result;
            }

            attempt += 1;
            let delay = self.delay_for(attempt);
            tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "retrying call");
            if let Some(hook) = &self.hook {
                hook.on_retry(attempt, delay);
            }

            sleep(delay).await;
        }
    }

    /// Computes the delay before retry `attempt` (1-based).
    pub(crate) fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.config.base_delay.as_millis() as u64;
        let raw_ms = match self.config.backoff {
            BackoffKind::Constant => base_ms,
            BackoffKind::Linear => base_ms.saturating_mul(attempt as u64),
            BackoffKind::Exponential => {
                base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
            }
        };
        let capped_ms = raw_ms.min(self.config.max_delay.as_millis() as u64);

        if self.config.use_jitter {
            let factor = rand::thread_rng().gen_range(JITTER_MIN..=JITTER_MAX);
            Duration::from_millis((capped_ms as f64 * factor) as u64)
        } else {
            Duration::from_millis(capped_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::transport::HttpResponse;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use test_case::test_case;

    fn policy(config: RetryConfig) -> RetryPolicy {
        RetryPolicy::new(config)
    }

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            use_jitter: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn returns_immediately_on_success() {
        let attempts = AtomicU32::new(0);
        let result = policy(fast_config())
            .execute(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok(HttpResponse::with_status(200)) }
            })
            .await;

        assert_eq!(result.unwrap().status, 200);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let attempts = AtomicU32::new(0);
        let result = policy(fast_config())
            .execute(|| {
                let count = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count < 2 {
                        Ok(HttpResponse::with_status(503))
                    } else {
                        Ok(HttpResponse::with_status(200))
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap().status, 200);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_returns_last_failure() {
        let attempts = AtomicU32::new(0);
        let result = policy(fast_config())
            .execute(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok(HttpResponse::with_status(503)) }
            })
            .await;

        // Initial attempt + 3 retries, and the terminal result is the
        // classified failure itself, not an error.
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(result.unwrap().status, 503);
    }

    #[tokio::test]
    async fn classifier_decides_what_is_retried() {
        let config = RetryConfig {
            classifier: OutcomeClassifier::statuses(&[429]),
            ..fast_config()
        };
        let attempts = AtomicU32::new(0);
        let result = policy(config)
            .execute(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                // 500 is not in the handled set, so no retry happens.
                async { Ok(HttpResponse::with_status(500)) }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap().status, 500);
    }

    #[tokio::test]
    async fn transport_errors_are_retried_and_propagated() {
        let attempts = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 2,
            base_delay: Duration::from_millis(5),
            use_jitter: false,
            ..Default::default()
        };
        let result = policy(config)
            .execute(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(Error::Connection {
                        message: "refused".to_string(),
                    })
                }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(Error::Connection { .. })));
    }

    #[tokio::test]
    async fn hook_sees_attempt_numbers_and_delays() {
        struct Recorder(Mutex<Vec<(u32, Duration)>>);
        impl RetryHook for Recorder {
            fn on_retry(&self, attempt: u32, delay: Duration) {
                self.0.lock().unwrap().push((attempt, delay));
            }
        }

        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 2,
            base_delay: Duration::from_millis(10),
            use_jitter: false,
            ..Default::default()
        })
        .with_hook(recorder.clone());

        let _ = policy
            .execute(|| async { Ok(HttpResponse::with_status(503)) })
            .await;

        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (1, Duration::from_millis(10)),
                (2, Duration::from_millis(20)),
            ]
        );
    }

    #[test]
    fn exponential_delays_double_per_attempt() {
        let policy = policy(RetryConfig {
            base_delay: Duration::from_secs(1),
            use_jitter: false,
            ..Default::default()
        });

        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    }

    #[test_case(BackoffKind::Constant, 3, 100 ; "constant stays flat")]
    #[test_case(BackoffKind::Linear, 3, 300 ; "linear grows by base")]
    #[test_case(BackoffKind::Exponential, 3, 400 ; "exponential doubles")]
    fn backoff_kinds(kind: BackoffKind, attempt: u32, expected_ms: u64) {
        let policy = policy(RetryConfig {
            base_delay: Duration::from_millis(100),
            backoff: kind,
            use_jitter: false,
            ..Default::default()
        });
        assert_eq!(policy.delay_for(attempt), Duration::from_millis(expected_ms));
    }

    #[test]
    fn delays_are_capped_at_max_delay() {
        let policy = policy(RetryConfig {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            use_jitter: false,
            ..Default::default()
        });
        assert_eq!(policy.delay_for(30), Duration::from_secs(1));
    }

    #[test]
    fn jittered_delays_stay_within_band() {
        let policy = policy(RetryConfig {
            base_delay: Duration::from_secs(1),
            use_jitter: true,
            ..Default::default()
        });

        let lower = Duration::from_secs_f64(2.0 * JITTER_MIN);
        let upper = Duration::from_secs_f64(2.0 * JITTER_MAX);
        for _ in 0..100 {
            let delay = policy.delay_for(2);
            assert!(delay >= lower && delay <= upper, "out of band: {:?}", delay);
        }
    }
}
