//! DMS configuration

use crate::DmsError;
use serde::{Deserialize, Serialize};

/// Six landmark indices describing one eye, corner to corner:
/// `[p0, p1, p2, p3, p4, p5]` where `p0`/`p3` are the corners,
/// `p1`/`p5` and `p2`/`p4` are the upper/lower lid pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EyeIndexSet(pub [usize; 6]);

impl EyeIndexSet {
    /// Face-mesh left eye
    pub const LEFT: Self = Self([33, 160, 158, 133, 153, 144]);
    /// Face-mesh right eye
    pub const RIGHT: Self = Self([362, 385, 387, 263, 373, 380]);

    pub fn indices(&self) -> &[usize; 6] {
        &self.0
    }

    /// Highest landmark index referenced by this eye
    pub fn max_index(&self) -> usize {
        self.0.iter().copied().max().unwrap_or(0)
    }

    fn has_duplicates(&self) -> bool {
        let idx = &self.0;
        (0..idx.len()).any(|i| idx[i + 1..].contains(&idx[i]))
    }
}

/// Space in which eye distances are measured
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoordinateSpace {
    /// Raw normalized landmark coordinates
    #[default]
    Normalized,
    /// Landmarks scaled to frame pixels before measuring
    Pixel { width: u32, height: u32 },
}

impl CoordinateSpace {
    /// Per-axis scale factors applied to normalized coordinates
    pub fn scale(&self) -> (f64, f64) {
        match *self {
            CoordinateSpace::Normalized => (1.0, 1.0),
            CoordinateSpace::Pixel { width, height } => (width as f64, height as f64),
        }
    }
}

/// Which EAR signal feeds the PERCLOS window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerclosInput {
    #[default]
    Smoothed,
    Raw,
}

/// DMS configuration
///
/// Thresholds are calibrated for `EAR = (A + B) / C`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Left eye landmark indices
    pub left_eye: EyeIndexSet,

    /// Right eye landmark indices
    pub right_eye: EyeIndexSet,

    /// Coordinate space for EAR distances
    pub coordinate_space: CoordinateSpace,

    /// EMA smoothing factor, in (0, 1]
    pub smoothing_alpha: f64,

    /// PERCLOS trailing window (seconds)
    pub perclos_window_seconds: f64,

    /// EAR below which a PERCLOS sample counts as closed
    pub perclos_ear_threshold: f64,

    /// PERCLOS fraction at which the driver is drowsy
    pub warning_threshold: f64,

    /// PERCLOS fraction at which a microsleep is reported
    pub danger_threshold: f64,

    /// Smoothed EAR below which a still image counts as eyes closed
    pub closed_threshold: f64,

    /// Signal appended to the PERCLOS window
    pub perclos_input: PerclosInput,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            left_eye: EyeIndexSet::LEFT,
            right_eye: EyeIndexSet::RIGHT,
            coordinate_space: CoordinateSpace::Normalized,
            smoothing_alpha: 0.3,
            perclos_window_seconds: 30.0,
            perclos_ear_threshold: 0.21,
            warning_threshold: 0.15,
            danger_threshold: 0.40,
            closed_threshold: 0.20,
            perclos_input: PerclosInput::Smoothed,
        }
    }
}

impl DmsConfig {
    /// Create strict config (lower thresholds)
    pub fn strict() -> Self {
        Self {
            warning_threshold: 0.10,
            danger_threshold: 0.30,
            ..Default::default()
        }
    }

    /// Create lenient config (higher thresholds)
    pub fn lenient() -> Self {
        Self {
            warning_threshold: 0.20,
            danger_threshold: 0.50,
            ..Default::default()
        }
    }

    /// Minimum number of landmarks a frame must carry
    pub fn required_landmarks(&self) -> usize {
        self.left_eye.max_index().max(self.right_eye.max_index()) + 1
    }

    /// Check the configuration for values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), DmsError> {
        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha <= 1.0) {
            return Err(DmsError::Config(format!(
                "smoothing_alpha must be in (0, 1], got {}",
                self.smoothing_alpha
            )));
        }
        if !(self.perclos_window_seconds > 0.0 && self.perclos_window_seconds.is_finite()) {
            return Err(DmsError::Config(format!(
                "perclos_window_seconds must be positive, got {}",
                self.perclos_window_seconds
            )));
        }
        if !(0.0..=1.0).contains(&self.warning_threshold)
            || !(0.0..=1.0).contains(&self.danger_threshold)
        {
            return Err(DmsError::Config("state thresholds must lie in [0, 1]".into()));
        }
        if self.warning_threshold >= self.danger_threshold {
            return Err(DmsError::Config(format!(
                "warning_threshold ({}) must be below danger_threshold ({})",
                self.warning_threshold, self.danger_threshold
            )));
        }
        if self.perclos_ear_threshold < 0.0 || self.closed_threshold < 0.0 {
            return Err(DmsError::Config("EAR thresholds must be non-negative".into()));
        }
        if self.left_eye.has_duplicates() || self.right_eye.has_duplicates() {
            return Err(DmsError::Config("eye index sets must not repeat an index".into()));
        }
        if self.left_eye == self.right_eye {
            return Err(DmsError::Config("left and right eye index sets must differ".into()));
        }
        if let CoordinateSpace::Pixel { width, height } = self.coordinate_space {
            if width == 0 || height == 0 {
                return Err(DmsError::Config("pixel coordinate space needs a non-zero frame size".into()));
            }
        }
        Ok(())
    }
}
