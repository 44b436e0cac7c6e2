//! Adaptive break durations derived from server-supplied retry hints.
//!
//! When a failing response carries a `Retry-After` header, the breaker can
//! suspend traffic for exactly as long as the server asked instead of the
//! static configured duration. The resolved hint travels in an explicit
//! [`BreakContext`] from the failure into the transition logic; there is no
//! ambient property bag.

use crate::transport::HttpResponse;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Extracts the retry hint from a failing response's `Retry-After` header.
///
/// Supports both header forms:
/// - delta-seconds (`Retry-After: 45`) is returned directly;
/// - HTTP-date (`Retry-After: Tue, 04 Aug 2026 17:00:00 GMT`) resolves to
///   `date - now`, clamped to zero when the date is already past.
///
/// Wall-clock arithmetic happens in UTC so a skewed local timezone cannot
/// distort the delay. Returns `None` for an absent or unparseable header.
pub fn retry_after_hint(response: &HttpResponse) -> Option<Duration> {
    let value = response.header(http::header::RETRY_AFTER.as_str())?.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date: DateTime<chrono::FixedOffset> = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.with_timezone(&Utc) - Utc::now();
    // A negative delta means the hint already expired; never sleep backwards.
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}

/// Per-breaking-event inputs to a [`BreakDurationGenerator`].
///
/// Built once when the breaker decides to open, from the triggering outcome;
/// consumed once by the generator and then discarded.
#[derive(Debug, Clone, Copy)]
pub struct BreakContext {
    /// Retry hint resolved from the triggering response, if any.
    pub retry_after: Option<Duration>,
    /// The statically configured break duration.
    pub fallback: Duration,
}

/// Strategy deriving the break duration for one breaking event.
pub type BreakDurationGenerator = Arc<dyn Fn(&BreakContext) -> Duration + Send + Sync>;

/// Stock generator: honor the server's retry hint, else the static duration.
pub fn from_retry_after() -> BreakDurationGenerator {
    Arc::new(|ctx| ctx.retry_after.unwrap_or(ctx.fallback))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with_retry_after(value: &str) -> HttpResponse {
        let mut response = HttpResponse::with_status(503);
        response
            .headers
            .insert(http::header::RETRY_AFTER, value.parse().unwrap());
        response
    }

    #[test]
    fn delta_seconds_resolve_exactly() {
        let response = response_with_retry_after("45");
        assert_eq!(retry_after_hint(&response), Some(Duration::from_secs(45)));
    }

    #[test]
    fn future_date_resolves_to_remaining_time() {
        let future = Utc::now() + chrono::Duration::seconds(10);
        let response = response_with_retry_after(&future.to_rfc2822());

        let hint = retry_after_hint(&response).expect("hint should resolve");
        assert!(hint <= Duration::from_secs(10));
        assert!(hint >= Duration::from_secs(8), "got {:?}", hint);
    }

    #[test]
    fn past_date_clamps_to_zero() {
        let past = Utc::now() - chrono::Duration::seconds(30);
        let response = response_with_retry_after(&past.to_rfc2822());
        assert_eq!(retry_after_hint(&response), Some(Duration::ZERO));
    }

    #[test]
    fn absent_or_garbage_header_yields_none() {
        assert_eq!(retry_after_hint(&HttpResponse::with_status(503)), None);
        let response = response_with_retry_after("soon-ish");
        assert_eq!(retry_after_hint(&response), None);
    }

    #[test]
    fn stock_generator_prefers_hint_over_fallback() {
        let generator = from_retry_after();
        let fallback = Duration::from_secs(30);

        let with_hint = BreakContext {
            retry_after: Some(Duration::from_secs(7)),
            fallback,
        };
        assert_eq!(generator(&with_hint), Duration::from_secs(7));

        let without_hint = BreakContext {
            retry_after: None,
            fallback,
        };
        assert_eq!(generator(&without_hint), fallback);
    }
}
