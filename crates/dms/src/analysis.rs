//! Instantaneous eye-closure analysis for still images

use crate::config::DmsConfig;
use crate::ear::{EarReading, EyeFeatureExtractor};
use crate::smoother::EarSmoother;
use crate::DmsError;
use landmarks::LandmarkPoint;
use serde::{Deserialize, Serialize};

/// Closure decision for one landmark set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosureReading {
    pub ear: EarReading,
    /// Average EAR after smoothing
    pub smoothed: f64,
    /// `smoothed < closed_threshold`
    pub eyes_closed: bool,
}

/// Per-image analysis record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub ear_left: f64,
    pub ear_right: f64,
    /// Smoothed average EAR
    pub ear_average: f64,
    pub eyes_closed: bool,
    /// Wall time of landmark detection plus EAR analysis for this image.
    /// Image decoding and model inference are included, so the derived FPS
    /// is end-to-end per image rather than the cost of the EAR step alone.
    pub inference_time_ms: f64,
}

impl AnalysisResult {
    pub fn new(reading: ClosureReading, inference_time_ms: f64) -> Self {
        Self {
            ear_left: reading.ear.left,
            ear_right: reading.ear.right,
            ear_average: reading.smoothed,
            eyes_closed: reading.eyes_closed,
            inference_time_ms,
        }
    }
}

/// EAR -> smoothing -> fixed-threshold closure decision.
///
/// Scores each landmark set on its own instant; no PERCLOS window involved.
#[derive(Debug, Clone)]
pub struct ClosureAnalyzer {
    extractor: EyeFeatureExtractor,
    smoother: EarSmoother,
    closed_threshold: f64,
}

impl ClosureAnalyzer {
    pub fn new(config: &DmsConfig) -> Result<Self, DmsError> {
        config.validate()?;
        Ok(Self {
            extractor: EyeFeatureExtractor::from_config(config),
            smoother: EarSmoother::new(config.smoothing_alpha)?,
            closed_threshold: config.closed_threshold,
        })
    }

    /// Analyze one landmark set; `None` if it lacks the eye landmarks.
    ///
    /// The smoother is left untouched on `None`.
    pub fn analyze(&mut self, landmarks: &[LandmarkPoint]) -> Option<ClosureReading> {
        let ear = self.extractor.extract(landmarks)?;
        let smoothed = self.smoother.update(ear.average);
        Some(ClosureReading {
            ear,
            smoothed,
            eyes_closed: smoothed < self.closed_threshold,
        })
    }

    /// Start a new independent sample
    pub fn reset(&mut self) {
        self.smoother.reset();
    }

    pub fn closed_threshold(&self) -> f64 {
        self.closed_threshold
    }

    pub fn required_landmarks(&self) -> usize {
        self.extractor.required_landmarks()
    }
}
