//! Reconnection backoff.
//!
//! Unbounded-attempt exponential backoff with a hard ceiling and no
//! jitter: every unclean closure multiplies the current delay by
//! [`BACKOFF_FACTOR`], clamped to [`MAX_RETRY_DELAY_SECS`]. A successful
//! open resets the delay to the configured base.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Growth factor applied per retry.
pub const BACKOFF_FACTOR: f64 = 1.25;

/// Ceiling for the retry delay, in seconds.
pub const MAX_RETRY_DELAY_SECS: f64 = 60.0;

/// Default base delay, in seconds.
pub const DEFAULT_RETRY_DELAY_SECS: f64 = 0.5;

// ============================================================================
// Backoff
// ============================================================================

/// Retry delay state for one client.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    /// Configured base delay in seconds.
    base: f64,
    /// Current delay in seconds.
    current: f64,
}

impl Backoff {
    /// Creates a backoff starting at `base` seconds.
    ///
    /// A base above [`MAX_RETRY_DELAY_SECS`] is clamped to it; a base that is
    /// not a positive finite number falls back to [`DEFAULT_RETRY_DELAY_SECS`].
    #[must_use]
    pub fn new(base: f64) -> Self {
        let base = if base.is_finite() && base > 0.0 {
            base.min(MAX_RETRY_DELAY_SECS)
        } else {
            DEFAULT_RETRY_DELAY_SECS
        };
        Self {
            base,
            current: base,
        }
    }

    /// Advances the delay and returns the wait before the next attempt.
    ///
    /// The Nth call after a reset yields `min(base * 1.25^N, 60)` seconds.
    pub fn next_delay(&mut self) -> Duration {
        self.current = (self.current * BACKOFF_FACTOR).min(MAX_RETRY_DELAY_SECS);
        self.current()
    }

    /// Returns the current delay without advancing it.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Duration {
        Duration::from_secs_f64(self.current)
    }

    /// Returns the configured base delay.
    #[inline]
    #[must_use]
    pub fn base(&self) -> Duration {
        Duration::from_secs_f64(self.base)
    }

    /// Resets the current delay to the base.
    #[inline]
    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_DELAY_SECS)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(actual: Duration, expected_secs: f64) -> bool {
        (actual.as_secs_f64() - expected_secs).abs() < 1e-9
    }

    #[test]
    fn test_first_delay_from_one_second_base() {
        let mut backoff = Backoff::new(1.0);
        assert!(approx_eq(backoff.next_delay(), 1.25));
    }

    #[test]
    fn test_delays_follow_geometric_sequence_until_cap() {
        let base = 2.0;
        let mut backoff = Backoff::new(base);
        let mut previous = Duration::ZERO;

        for n in 1..=40 {
            let delay = backoff.next_delay();
            let expected = (base * BACKOFF_FACTOR.powi(n)).min(MAX_RETRY_DELAY_SECS);
            assert!(
                (delay.as_secs_f64() - expected).abs() < 1e-6,
                "attempt {n}: {delay:?} != {expected}"
            );
            assert!(delay >= previous);
            previous = delay;
        }

        assert!(approx_eq(previous, MAX_RETRY_DELAY_SECS));
    }

    #[test]
    fn test_reset_returns_to_base() {
        let mut backoff = Backoff::new(1.0);
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.current(), backoff.base());
        assert!(approx_eq(backoff.next_delay(), 1.25));
    }

    #[test]
    fn test_out_of_range_base_is_sanitized() {
        let huge = Backoff::new(1e20);
        assert!(approx_eq(huge.base(), MAX_RETRY_DELAY_SECS));
        assert!(approx_eq(huge.current(), MAX_RETRY_DELAY_SECS));

        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let backoff = Backoff::new(bad);
            assert!(approx_eq(backoff.base(), DEFAULT_RETRY_DELAY_SECS));
        }
    }

    #[test]
    fn test_default_base() {
        let backoff = Backoff::default();
        assert!(approx_eq(backoff.base(), DEFAULT_RETRY_DELAY_SECS));
    }
}
