//! Driver Monitoring System (DMS)
//!
//! Drowsiness estimation from facial landmarks:
//! - Eye Aspect Ratio (EAR) extraction per eye
//! - Exponential smoothing of the EAR signal
//! - PERCLOS over a trailing time window
//! - Threshold-ladder classification into alertness states
//! - Instantaneous closure analysis for still images

pub mod analysis;
pub mod clock;
pub mod config;
pub mod ear;
#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;
pub mod monitor;
pub mod perclos;
pub mod smoother;
pub mod state;

pub use analysis::{AnalysisResult, ClosureAnalyzer, ClosureReading};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{CoordinateSpace, DmsConfig, EyeIndexSet, PerclosInput};
pub use ear::{extract_ear, EarReading, EyeFeatureExtractor};
pub use monitor::{DrowsinessMonitor, FrameOutcome};
pub use perclos::{EarSample, PerclosAccumulator};
pub use smoother::EarSmoother;
pub use state::{classify, DrowsinessState, StatusSnapshot, ThresholdLadder};

use thiserror::Error;

/// DMS error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DmsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Landmark set has {found} points, {required} required")]
    InsufficientLandmarks { found: usize, required: usize },

    #[error("Timestamp {got} is earlier than the last sample at {last}")]
    NonMonotonicTimestamp { last: f64, got: f64 },
}
