//! Exponential backoff with full jitter.

use std::time::Duration;

use rand::Rng;

/// Delay before the first retry.
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
/// Upper bound on any single delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(10);
/// Growth factor between consecutive delays.
pub const BACKOFF_FACTOR: f64 = 2.0;
/// Retries after the first attempt; total attempts is one more.
pub const MAX_RETRIES: u32 = 5;

/// Retry schedule for publishing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub factor: f64,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
            factor: BACKOFF_FACTOR,
            max_retries: MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    /// Total number of publish attempts.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// First backoff ceiling, never above the cap.
    pub fn first_backoff(&self) -> Duration {
        self.initial_backoff.min(self.max_backoff)
    }

    /// `min(b * factor, max_backoff)`.
    pub fn next_backoff(&self, current: Duration) -> Duration {
        let factor = if self.factor.is_finite() && self.factor >= 1.0 {
            self.factor
        } else {
            1.0
        };
        let scaled = current.as_secs_f64() * factor;
        if scaled >= self.max_backoff.as_secs_f64() {
            self.max_backoff
        } else {
            Duration::from_secs_f64(scaled)
        }
    }

    /// The backoff ceiling used before retry number `retry` (zero based).
    pub fn ceiling(&self, retry: u32) -> Duration {
        (0..retry).fold(self.first_backoff(), |backoff, _| self.next_backoff(backoff))
    }
}

/// Uniform random delay in `[0, ceiling]`.
pub fn full_jitter(ceiling: Duration) -> Duration {
    let nanos = u64::try_from(ceiling.as_nanos()).unwrap_or(u64::MAX);
    if nanos == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rand::thread_rng().gen_range(0..=nanos))
}
