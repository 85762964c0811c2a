//! Eye Aspect Ratio (EAR) extraction
//!
//! For one eye `[p0..p5]`: `A = |p1 - p5|`, `B = |p2 - p4|`, `C = |p0 - p3|`
//! and `EAR = (A + B) / C`. A zero horizontal distance yields `0.0`.

use crate::config::{CoordinateSpace, DmsConfig, EyeIndexSet};
use crate::DmsError;
use landmarks::LandmarkPoint;
use serde::{Deserialize, Serialize};

/// EAR of both eyes for one landmark set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarReading {
    pub left: f64,
    pub right: f64,
    /// `(left + right) / 2`
    pub average: f64,
}

/// Computes per-eye EAR from a landmark set
#[derive(Debug, Clone)]
pub struct EyeFeatureExtractor {
    left: EyeIndexSet,
    right: EyeIndexSet,
    space: CoordinateSpace,
}

impl EyeFeatureExtractor {
    pub fn new(left: EyeIndexSet, right: EyeIndexSet, space: CoordinateSpace) -> Self {
        Self { left, right, space }
    }

    pub fn from_config(config: &DmsConfig) -> Self {
        Self::new(config.left_eye, config.right_eye, config.coordinate_space)
    }

    /// Minimum landmark count needed to resolve every index
    pub fn required_landmarks(&self) -> usize {
        self.left.max_index().max(self.right.max_index()) + 1
    }

    /// EAR for both eyes, or `None` if the landmark set is too short
    pub fn extract(&self, landmarks: &[LandmarkPoint]) -> Option<EarReading> {
        let left = eye_aspect_ratio(landmarks, &self.left, self.space)?;
        let right = eye_aspect_ratio(landmarks, &self.right, self.space)?;
        Some(EarReading {
            left,
            right,
            average: (left + right) / 2.0,
        })
    }
}

/// EAR of a single eye; `None` when an index is out of range
pub fn eye_aspect_ratio(
    landmarks: &[LandmarkPoint],
    eye: &EyeIndexSet,
    space: CoordinateSpace,
) -> Option<f64> {
    let [i0, i1, i2, i3, i4, i5] = *eye.indices();
    let p0 = landmarks.get(i0)?;
    let p1 = landmarks.get(i1)?;
    let p2 = landmarks.get(i2)?;
    let p3 = landmarks.get(i3)?;
    let p4 = landmarks.get(i4)?;
    let p5 = landmarks.get(i5)?;

    let (sx, sy) = space.scale();
    let a = p1.distance_scaled(p5, sx, sy);
    let b = p2.distance_scaled(p4, sx, sy);
    let c = p0.distance_scaled(p3, sx, sy);

    if c == 0.0 {
        return Some(0.0);
    }
    Some((a + b) / c)
}

/// Average EAR of both eyes in normalized coordinates.
///
/// Fails with [`DmsError::InsufficientLandmarks`] if the landmark set does not
/// cover every referenced index.
pub fn extract_ear(
    landmarks: &[LandmarkPoint],
    left: &EyeIndexSet,
    right: &EyeIndexSet,
) -> Result<f64, DmsError> {
    let extractor = EyeFeatureExtractor::new(*left, *right, CoordinateSpace::Normalized);
    extractor
        .extract(landmarks)
        .map(|reading| reading.average)
        .ok_or(DmsError::InsufficientLandmarks {
            found: landmarks.len(),
            required: extractor.required_landmarks(),
        })
}
