//! Time-related utilities with clock abstraction for testability.
//!
//! Intervals (throttles, bubble expiry) are measured with a monotonic
//! [`Clock`]; chrono is only used to label notices with the wall-clock time.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, TimeZone};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Milliseconds on this clock's own timeline. Only differences between
    /// two readings are meaningful.
    fn now_millis(&self) -> i64;
}

/// Monotonic clock: milliseconds elapsed since it was created.
///
/// Unaffected by wall-clock adjustments such as NTP steps.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        duration_millis(self.origin.elapsed())
    }
}

/// Manually driven clock for tests.
///
/// Starts at the given timestamp and only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(duration_millis(by), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Convert a duration to whole milliseconds, saturating at `i64::MAX`.
pub fn duration_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// Format a wall-clock time as `HH:MM:SS`.
pub fn format_time_of_day<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    at.format("%H:%M:%S").to_string()
}

/// The current local time of day, for notice prefixes.
pub fn local_time_of_day() -> String {
    format_time_of_day(&Local::now())
}
