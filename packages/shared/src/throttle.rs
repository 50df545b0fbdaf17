//! Minimum-interval gate.

use std::time::Duration;

use crate::time::duration_millis;

/// Accepts an event only if at least `interval` has passed since the last
/// accepted one. The very first event is always accepted.
///
/// A reading earlier than the last accepted one means the clock went back;
/// that event passes and becomes the new reference point.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval_millis: i64,
    last_accepted: Option<i64>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_millis: duration_millis(interval),
            last_accepted: None,
        }
    }

    /// Whether an event at `now` would pass, without recording it.
    pub fn is_ready(&self, now_millis: i64) -> bool {
        match self.last_accepted {
            Some(last) if now_millis < last => true,
            Some(last) => now_millis.saturating_sub(last) >= self.interval_millis,
            None => true,
        }
    }

    /// Record an accepted event at `now`.
    pub fn mark(&mut self, now_millis: i64) {
        self.last_accepted = Some(now_millis);
    }

    /// Check and record in one step.
    pub fn try_acquire(&mut self, now_millis: i64) -> bool {
        if self.is_ready(now_millis) {
            self.mark(now_millis);
            true
        } else {
            false
        }
    }
}
