//! Circuit breaker state machine gating calls to a failing dependency.
//!
//! One breaker instance exists per logical pipeline and is shared by every
//! concurrent caller through an `Arc` handle; there is no global registry.
//! All state transitions and window mutations happen under a single lock, so
//! a breaking event opens the circuit exactly once and the half-open probe is
//! claimed by exactly one caller.

use crate::errors::CircuitOpenRejection;
use crate::outcome::{CallResult, OutcomeClassifier};
use crate::resilience::break_duration::{
    retry_after_hint, BreakContext, BreakDurationGenerator,
};
use crate::resilience::window::RollingWindow;
use crate::{
    DEFAULT_BREAK_DURATION, DEFAULT_FAILURE_RATIO, DEFAULT_MINIMUM_THROUGHPUT,
    DEFAULT_SAMPLING_DURATION,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, calls flow through and feed the rolling window.
    Closed,
    /// Dependency assumed down; calls are rejected until the break elapses.
    Open,
    /// Break elapsed; a single probe call tests recovery.
    HalfOpen,
    /// Manually forced open; stays until [`ManualControl::close`].
    Isolated,
}

/// Configuration for circuit breaker behavior
#[derive(Clone)]
pub struct CircuitBreakerConfig {
    /// Failure ratio in `(0, 1]` at which the circuit opens.
    pub failure_ratio: f64,
    /// Length of the rolling window feeding the ratio.
    pub sampling_duration: Duration,
    /// Minimum samples in the window before the ratio is acted on.
    pub minimum_throughput: u64,
    /// Static break duration, also the fallback for the generator.
    pub break_duration: Duration,
    /// Optional strategy deriving an adaptive break duration per breaking
    /// event (see [`crate::resilience::break_duration::from_retry_after`]).
    pub break_duration_generator: Option<BreakDurationGenerator>,
    /// Predicate deciding which results count as breaker failures.
    pub classifier: OutcomeClassifier,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_ratio: DEFAULT_FAILURE_RATIO,
            sampling_duration: DEFAULT_SAMPLING_DURATION,
            minimum_throughput: DEFAULT_MINIMUM_THROUGHPUT,
            break_duration: DEFAULT_BREAK_DURATION,
            break_duration_generator: None,
            classifier: OutcomeClassifier::statuses(&[503, 429]),
        }
    }
}

impl fmt::Debug for CircuitBreakerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerConfig")
            .field("failure_ratio", &self.failure_ratio)
            .field("sampling_duration", &self.sampling_duration)
            .field("minimum_throughput", &self.minimum_throughput)
            .field("break_duration", &self.break_duration)
            .field(
                "break_duration_generator",
                &self.break_duration_generator.as_ref().map(|_| "…"),
            )
            .finish()
    }
}

/// Hook for circuit breaker lifecycle events.
///
/// Invoked after the corresponding state mutation has committed and outside
/// the breaker's lock; implementations cannot gate transitions.
pub trait CircuitBreakerHook: Send + Sync {
    /// The circuit opened for `break_duration`, triggered by a result with
    /// the given status (`None` for a transport error).
    fn on_opened(&self, break_duration: Duration, triggering_status: Option<u16>) {
        let _ = (break_duration, triggering_status);
    }

    /// The circuit closed and normal operation resumed.
    fn on_closed(&self) {}

    /// The circuit was manually isolated.
    fn on_isolated(&self) {}
}

/// Admission token returned by [`CircuitBreaker::try_acquire`].
///
/// Handed back to [`CircuitBreaker::record`] with the call's classified
/// outcome so the breaker knows whether it is resolving the half-open probe
/// or a regular closed-state call.
#[derive(Debug)]
pub struct Permit {
    kind: PermitKind,
    /// Half-open cycle that issued a probe permit. A probe outcome only
    /// resolves the trial of its own cycle; anything older is stale.
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PermitKind {
    Normal,
    Probe,
}

/// Counters accumulated over the breaker's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerStats {
    /// Admission checks performed.
    pub total_calls: u64,
    /// Classified failures observed.
    pub total_failures: u64,
    /// Calls rejected without touching the transport.
    pub total_rejections: u64,
}

struct BreakerInner {
    state: CircuitState,
    window: RollingWindow,
    open_until: Option<Instant>,
    probe_in_flight: bool,
    // Bumped on every Open -> HalfOpen transition.
    generation: u64,
}

enum BreakerEvent {
    Opened {
        break_duration: Duration,
        triggering_status: Option<u16>,
    },
    Closed,
    Isolated,
}

/// Circuit breaker implementation
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
    hook: Option<Arc<dyn CircuitBreakerHook>>,
    total_calls: AtomicU64,
    total_failures: AtomicU64,
    total_rejections: AtomicU64,
}

impl CircuitBreaker {
    /// Creates a breaker for the named pipeline.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let window = RollingWindow::new(config.sampling_duration, Instant::now());
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                window,
                open_until: None,
                probe_in_flight: false,
                generation: 0,
            }),
            hook: None,
            total_calls: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            total_rejections: AtomicU64::new(0),
        }
    }

    /// Attaches a lifecycle hook.
    pub fn with_hook(mut self, hook: Arc<dyn CircuitBreakerHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Returns the current state, advancing `Open` to `HalfOpen` when the
    /// break has elapsed.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        self.poll_state(&mut inner);
        inner.state
    }

    /// First-pass admission check.
    ///
    /// Returns a [`Permit`] when the call may proceed, or a rejection when
    /// the circuit is `Open`, `Isolated`, or `HalfOpen` with the probe
    /// already claimed. The probe claim happens atomically under the
    /// breaker's lock, so concurrent callers arriving in the same half-open
    /// instant admit exactly one probe.
    pub fn try_acquire(&self) -> Result<Permit, CircuitOpenRejection> {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.inner.lock();
        self.poll_state(&mut inner);

        let rejection = match inner.state {
            CircuitState::Closed => {
                return Ok(Permit {
                    kind: PermitKind::Normal,
                    generation: inner.generation,
                })
            }
            CircuitState::HalfOpen => {
                if !inner.probe_in_flight {
                    inner.probe_in_flight = true;
                    return Ok(Permit {
                        kind: PermitKind::Probe,
                        generation: inner.generation,
                    });
                }
                CircuitOpenRejection { retry_after: None }
            }
            CircuitState::Open => CircuitOpenRejection {
                retry_after: inner
                    .open_until
                    .map(|until| until.saturating_duration_since(Instant::now())),
            },
            CircuitState::Isolated => CircuitOpenRejection { retry_after: None },
        };

        drop(inner);
        self.total_rejections.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(pipeline = %self.name, "call rejected, circuit not accepting traffic");
        Err(rejection)
    }

    /// Feeds one classified outcome back into the breaker.
    ///
    /// Closed-state outcomes enter the rolling window and may open the
    /// circuit; a probe outcome resolves the half-open trial. Outcomes that
    /// arrive after the breaker has left the state that admitted them are
    /// discarded.
    pub fn record(&self, permit: &Permit, result: &CallResult) {
        let is_failure = self.config.classifier.is_failure(result);
        if is_failure {
            self.total_failures.fetch_add(1, Ordering::Relaxed);
        }

        let mut event = None;
        {
            let mut inner = self.inner.lock();
            self.poll_state(&mut inner);

            match (inner.state, permit.kind) {
                (CircuitState::HalfOpen, PermitKind::Probe)
                    if permit.generation == inner.generation =>
                {
                    inner.probe_in_flight = false;
                    if is_failure {
                        event = Some(self.open_locked(&mut inner, result));
                    } else {
                        inner.state = CircuitState::Closed;
                        inner.window.reset();
                        inner.open_until = None;
                        event = Some(BreakerEvent::Closed);
                    }
                }
                (CircuitState::Closed, PermitKind::Normal) => {
                    let now = Instant::now();
                    inner.window.record(now, is_failure);
                    if is_failure && self.should_open(&inner, now) {
                        event = Some(self.open_locked(&mut inner, result));
                    }
                }
                // Stale outcome: the state that admitted this call is gone.
                _ => {}
            }
        }

        if let Some(event) = event {
            self.emit(event);
        }
    }

    /// Time remaining until the breaker schedules its half-open probe.
    pub fn time_until_half_open(&self) -> Option<Duration> {
        let inner = self.inner.lock();
        match (inner.state, inner.open_until) {
            (CircuitState::Open, Some(until)) => {
                Some(until.saturating_duration_since(Instant::now()))
            }
            _ => None,
        }
    }

    /// Returns lifetime counters.
    pub fn stats(&self) -> CircuitBreakerStats {
        CircuitBreakerStats {
            total_calls: self.total_calls.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            total_rejections: self.total_rejections.load(Ordering::Relaxed),
        }
    }

    /// Forces the circuit into `Isolated`, bypassing all statistics.
    ///
    /// Takes the breaker's lock, so once this returns no admission check can
    /// observe a pre-isolation state.
    pub fn isolate(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.state == CircuitState::Isolated {
                return;
            }
            inner.state = CircuitState::Isolated;
            inner.open_until = None;
            inner.probe_in_flight = false;
        }
        self.emit(BreakerEvent::Isolated);
    }

    /// Returns the circuit to `Closed` with a cleared window.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.state == CircuitState::Closed {
                return;
            }
            inner.state = CircuitState::Closed;
            inner.window.reset();
            inner.open_until = None;
            inner.probe_in_flight = false;
        }
        self.emit(BreakerEvent::Closed);
    }

    fn poll_state(&self, inner: &mut BreakerInner) {
        if inner.state == CircuitState::Open {
            if let Some(until) = inner.open_until {
                if Instant::now() >= until {
                    inner.state = CircuitState::HalfOpen;
                    inner.open_until = None;
                    inner.probe_in_flight = false;
                    inner.generation += 1;
                    tracing::debug!(pipeline = %self.name, "break elapsed, circuit half-open");
                }
            }
        }
    }

    fn should_open(&self, inner: &BreakerInner, now: Instant) -> bool {
        if inner.window.throughput(now) < self.config.minimum_throughput {
            return false;
        }
        match inner.window.failure_ratio(now) {
            Some(ratio) => ratio >= self.config.failure_ratio,
            None => false,
        }
    }

    /// Transitions to `Open`. The break duration is resolved once, here, from
    /// the triggering outcome's retry hint; it stays fixed for the whole
    /// break.
    fn open_locked(&self, inner: &mut BreakerInner, trigger: &CallResult) -> BreakerEvent {
        let response = trigger.as_ref().ok();
        let ctx = BreakContext {
            retry_after: response.and_then(retry_after_hint),
            fallback: self.config.break_duration,
        };
        let break_duration = match &self.config.break_duration_generator {
            Some(generator) => generator(&ctx),
            None => self.config.break_duration,
        };

        inner.state = CircuitState::Open;
        inner.open_until = Some(Instant::now() + break_duration);
        inner.probe_in_flight = false;

        BreakerEvent::Opened {
            break_duration,
            triggering_status: response.map(|r| r.status),
        }
    }

    fn emit(&self, event: BreakerEvent) {
        match event {
            BreakerEvent::Opened {
                break_duration,
                triggering_status,
            } => {
                tracing::warn!(
                    pipeline = %self.name,
                    break_secs = break_duration.as_secs_f64(),
                    status = ?triggering_status,
                    "circuit opened"
                );
                if let Some(hook) = &self.hook {
                    hook.on_opened(break_duration, triggering_status);
                }
            }
            BreakerEvent::Closed => {
                tracing::info!(pipeline = %self.name, "circuit closed, resuming normal operation");
                if let Some(hook) = &self.hook {
                    hook.on_closed();
                }
            }
            BreakerEvent::Isolated => {
                tracing::warn!(pipeline = %self.name, "circuit manually isolated");
                if let Some(hook) = &self.hook {
                    hook.on_isolated();
                }
            }
        }
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.inner.lock().state)
            .finish()
    }
}

/// Operator handle to force-isolate or force-close a breaker.
///
/// Cheap to clone; all clones address the same breaker. Both operations take
/// the breaker's lock, so they are linearizable with admission checks: once a
/// call returns, every subsequent [`CircuitBreaker::try_acquire`] sees the
/// new state.
#[derive(Clone)]
pub struct ManualControl {
    breaker: Arc<CircuitBreaker>,
}

impl ManualControl {
    pub(crate) fn new(breaker: Arc<CircuitBreaker>) -> Self {
        Self { breaker }
    }

    /// Forces the circuit into `Isolated`.
    pub fn isolate(&self) {
        self.breaker.isolate();
    }

    /// Returns the circuit to `Closed` with cleared statistics.
    pub fn close(&self) {
        self.breaker.close();
    }

    /// Reads the current circuit state.
    pub fn state(&self) -> CircuitState {
        self.breaker.state()
    }
}
