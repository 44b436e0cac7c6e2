//! Rolling window of success/failure counts feeding the breaker's ratio
//! decision.
//!
//! Samples are folded into a fixed ring of time buckets rather than kept as a
//! growing list, so a record is O(1) and totals are O(bucket count). Callers
//! pass `now` explicitly; the window itself never reads the clock.

use std::time::{Duration, Instant};

/// Number of buckets the sampling duration is divided into.
///
/// Expiry error is bounded by one bucket span, i.e. a tenth of the sampling
/// duration.
const BUCKET_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    epoch: u64,
    successes: u64,
    failures: u64,
}

/// Time-bucketed failure/success counters over a sliding sampling window.
#[derive(Debug)]
pub struct RollingWindow {
    bucket_span_nanos: u128,
    origin: Instant,
    buckets: [Bucket; BUCKET_COUNT],
}

impl RollingWindow {
    /// Creates a window spanning `sampling_duration`, anchored at `origin`.
    pub fn new(sampling_duration: Duration, origin: Instant) -> Self {
        let span = sampling_duration / BUCKET_COUNT as u32;
        Self {
            bucket_span_nanos: span.max(Duration::from_millis(1)).as_nanos(),
            origin,
            buckets: [Bucket::default(); BUCKET_COUNT],
        }
    }

    fn epoch_of(&self, now: Instant) -> u64 {
        (now.saturating_duration_since(self.origin).as_nanos() / self.bucket_span_nanos) as u64
    }

    /// Records one classified outcome.
    pub fn record(&mut self, now: Instant, is_failure: bool) {
        let epoch = self.epoch_of(now);
        let bucket = &mut self.buckets[(epoch % BUCKET_COUNT as u64) as usize];
        if bucket.epoch != epoch {
            // The slot belongs to an expired revolution of the ring.
            *bucket = Bucket {
                epoch,
                ..Bucket::default()
            };
        }
        if is_failure {
            bucket.failures += 1;
        } else {
            bucket.successes += 1;
        }
    }

    fn live_totals(&self, now: Instant) -> (u64, u64) {
        let current = self.epoch_of(now);
        let oldest = current.saturating_sub(BUCKET_COUNT as u64 - 1);
        let mut total = 0;
        let mut failures = 0;
        for bucket in &self.buckets {
            if bucket.epoch >= oldest && bucket.epoch <= current {
                total += bucket.successes + bucket.failures;
                failures += bucket.failures;
            }
        }
        (total, failures)
    }

    /// Number of samples in non-expired buckets.
    pub fn throughput(&self, now: Instant) -> u64 {
        self.live_totals(now).0
    }

    /// Failure ratio over non-expired buckets, or `None` for an empty window.
    ///
    /// An empty window has no defined ratio; callers treat `None` as
    /// not-enough-throughput.
    pub fn failure_ratio(&self, now: Instant) -> Option<f64> {
        let (total, failures) = self.live_totals(now);
        if total == 0 {
            None
        } else {
            Some(failures as f64 / total as f64)
        }
    }

    /// Discards all samples.
    pub fn reset(&mut self) {
        self.buckets = [Bucket::default(); BUCKET_COUNT];
    }
}
