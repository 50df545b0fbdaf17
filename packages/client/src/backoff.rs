//! Exponential reconnect backoff with jitter.

use std::{ops::RangeInclusive, time::Duration};

use rand::Rng;

pub const BASE_BACKOFF: Duration = Duration::from_secs(1);
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Multiplier band applied to each delay so clients that dropped together
/// do not retry together.
pub const JITTER: RangeInclusive<f64> = 0.75..=1.25;

/// Retry delay state.
///
/// Each call to [`Backoff::next_delay`] yields `min(current × jitter, max)`
/// and then doubles `current` (capped at `max`). [`Backoff::reset`] returns
/// to the base after a successful open.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let max = max.max(base);
        Self {
            base,
            max,
            current: base,
        }
    }

    /// Un-jittered delay the next attempt will be based on.
    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }

    pub fn next_delay<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Duration {
        let jitter = rng.random_range(JITTER);
        self.next_delay_with_jitter(jitter)
    }

    /// Like [`Backoff::next_delay`] with a caller-chosen jitter factor,
    /// clamped into [`JITTER`].
    pub fn next_delay_with_jitter(&mut self, jitter: f64) -> Duration {
        let jitter = if jitter.is_nan() {
            1.0
        } else {
            jitter.clamp(*JITTER.start(), *JITTER.end())
        };
        let delay = self.current.mul_f64(jitter).min(self.max);
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BASE_BACKOFF, MAX_BACKOFF)
    }
}
