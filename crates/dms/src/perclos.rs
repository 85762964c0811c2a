//! PERCLOS (Percentage of Eye Closure) over a trailing time window

use crate::config::DmsConfig;
use crate::state::{DrowsinessState, StatusSnapshot, ThresholdLadder};
use crate::DmsError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Minimum samples before a PERCLOS value is reported
const MIN_SAMPLES: usize = 2;

/// One accepted EAR measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarSample {
    /// Monotonic seconds
    pub timestamp: f64,
    pub value: f64,
}

/// Sliding-window PERCLOS accumulator.
///
/// Samples are appended in time order and evicted from the front once they
/// fall more than `window_seconds` behind the newest sample.
#[derive(Debug, Clone)]
pub struct PerclosAccumulator {
    window: VecDeque<EarSample>,
    window_seconds: f64,
    ear_threshold: f64,
    ladder: ThresholdLadder,
    current_perclos: f64,
    current_state: DrowsinessState,
}

impl PerclosAccumulator {
    pub fn new(window_seconds: f64, ear_threshold: f64) -> Result<Self, DmsError> {
        Self::with_ladder(window_seconds, ear_threshold, ThresholdLadder::default())
    }

    pub fn with_ladder(
        window_seconds: f64,
        ear_threshold: f64,
        ladder: ThresholdLadder,
    ) -> Result<Self, DmsError> {
        if !(window_seconds > 0.0 && window_seconds.is_finite()) {
            return Err(DmsError::Config(format!(
                "window_seconds must be positive, got {}",
                window_seconds
            )));
        }
        Ok(Self {
            window: VecDeque::new(),
            window_seconds,
            ear_threshold,
            ladder,
            current_perclos: 0.0,
            current_state: DrowsinessState::Attentive,
        })
    }

    pub fn from_config(config: &DmsConfig) -> Result<Self, DmsError> {
        let ladder = ThresholdLadder::with_thresholds(config.warning_threshold, config.danger_threshold)?;
        Self::with_ladder(config.perclos_window_seconds, config.perclos_ear_threshold, ladder)
    }

    /// Append a measurement and evict everything older than the window.
    ///
    /// Timestamps must not go backwards; an out-of-order sample is rejected
    /// and leaves the window untouched.
    pub fn add_measurement(&mut self, value: f64, timestamp: f64) -> Result<(), DmsError> {
        if let Some(last) = self.window.back() {
            if timestamp < last.timestamp {
                return Err(DmsError::NonMonotonicTimestamp {
                    last: last.timestamp,
                    got: timestamp,
                });
            }
        }

        self.window.push_back(EarSample { timestamp, value });

        let cutoff = timestamp - self.window_seconds;
        let mut evicted = 0usize;
        while let Some(front) = self.window.front() {
            if front.timestamp >= cutoff {
                break;
            }
            self.window.pop_front();
            evicted += 1;
        }
        if evicted > 0 {
            debug!("Evicted {} samples older than {:.3}s", evicted, cutoff);
        }

        Ok(())
    }

    /// Fraction of window samples below the EAR threshold.
    ///
    /// Returns `0.0` with fewer than two samples. Updates the cached reading
    /// and state.
    pub fn calculate(&mut self) -> f64 {
        let perclos = if self.window.len() < MIN_SAMPLES {
            0.0
        } else {
            let closed = self
                .window
                .iter()
                .filter(|s| s.value < self.ear_threshold)
                .count();
            closed as f64 / self.window.len() as f64
        };

        let state = self.ladder.classify(perclos);
        if state != self.current_state {
            info!(
                "Driver state {} -> {} (PERCLOS {:.1}%)",
                self.current_state,
                state,
                perclos * 100.0
            );
        }

        self.current_perclos = perclos;
        self.current_state = state;
        perclos
    }

    /// Snapshot of the cached reading
    pub fn get_state(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.current_state,
            perclos: self.current_perclos,
            perclos_percentage: self.current_perclos * 100.0,
            is_warning: self.current_perclos >= self.ladder.warning_threshold(),
            is_danger: self.current_perclos >= self.ladder.danger_threshold(),
            samples_in_window: self.window.len(),
            window_seconds: self.window_seconds,
        }
    }

    /// Clear the window and return to the initial reading
    pub fn reset(&mut self) {
        self.window.clear();
        self.current_perclos = 0.0;
        self.current_state = DrowsinessState::Attentive;
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Samples currently in the window, oldest first
    pub fn samples(&self) -> impl Iterator<Item = &EarSample> {
        self.window.iter()
    }

    /// Timestamp of the newest sample
    pub fn last_timestamp(&self) -> Option<f64> {
        self.window.back().map(|s| s.timestamp)
    }

    pub fn window_seconds(&self) -> f64 {
        self.window_seconds
    }

    pub fn ear_threshold(&self) -> f64 {
        self.ear_threshold
    }
}
