//! Clock abstraction for timer deadlines and progress timestamps.
//!
//! The engine never reads time ambiently; it asks the injected clock. This
//! keeps every timer and poll deadline deterministic under test, where a
//! [`ManualClock`] is advanced by hand instead of waiting on wall time.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of monotonic and wall-clock time.
pub trait Clock: Send + Sync {
    /// Monotonic instant used for timer deadlines and poll cadence.
    fn now(&self) -> Instant;

    /// Wall-clock timestamp used for progress records and event metadata.
    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Production clock backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic tests and replays.
///
/// Cloning shares the underlying instant, so a test can hold one handle
/// while the engine holds another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualClockState>>,
}

#[derive(Debug)]
struct ManualClockState {
    now: Instant,
    utc: DateTime<Utc>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualClockState {
                now: Instant::now(),
                utc: Utc::now(),
            })),
        }
    }

    /// Move both the monotonic and wall clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut state = self.inner.lock().expect("manual clock poisoned");
        state.now += delta;
        state.utc += chrono::Duration::from_std(delta).unwrap_or_else(|_| chrono::Duration::zero());
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.inner.lock().expect("manual clock poisoned").now
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.inner.lock().expect("manual clock poisoned").utc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_starts_frozen() {
        let clock = ManualClock::new();
        let first = clock.now();
        let second = clock.now();
        assert_eq!(first, second);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.now() - start, Duration::from_millis(1500));
    }

    #[test]
    fn test_manual_clock_handles_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance(Duration::from_secs(3));
        assert_eq!(clock.now(), handle.now());
    }
}
