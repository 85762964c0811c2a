//! Time sources for the signal pipeline

use std::cell::Cell;
use std::time::Instant;

/// Monotonic time source in seconds
pub trait Clock {
    fn now_seconds(&self) -> f64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_seconds(&self) -> f64 {
        (**self).now_seconds()
    }
}

/// Wall-clock time measured from the moment the clock was created
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_seconds(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Manually driven clock for tests and deterministic replays.
///
/// Every read returns the current time and then advances it by `step`.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Cell<f64>,
    step: f64,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self::with_step(start, 0.0)
    }

    pub fn with_step(start: f64, step: f64) -> Self {
        Self {
            now: Cell::new(start),
            step,
        }
    }

    pub fn set(&self, seconds: f64) {
        self.now.set(seconds);
    }

    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }
}

impl Clock for ManualClock {
    fn now_seconds(&self) -> f64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}
