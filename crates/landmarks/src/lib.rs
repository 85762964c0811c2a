//! Facial Landmark Sources
//!
//! Boundary to the face-landmark detector. A source yields, per image or
//! frame, an ordered set of normalized 2D landmark points or reports that no
//! face was found:
//! - Sidecar JSON files with precomputed landmarks
//! - ONNX face-mesh model inference
//! - Recorded landmark streams (JSON lines) for real-time replay

pub mod face_mesh;
pub mod sidecar;
pub mod stream;

pub use face_mesh::{FaceMeshConfig, FaceMeshSource};
pub use sidecar::SidecarSource;
pub use stream::{FrameReader, LandmarkFrame};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Number of points produced by a face-mesh landmark model
pub const FACE_MESH_LANDMARKS: usize = 468;

/// Landmark source error types
#[derive(Error, Debug)]
pub enum LandmarkError {
    #[error("Model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Failed to read image {path}: {reason}")]
    ImageRead { path: PathBuf, reason: String },

    #[error("Invalid landmark data in {path}: {reason}")]
    InvalidData { path: PathBuf, reason: String },

    #[error("Malformed landmark stream at line {line}: {reason}")]
    MalformedStream { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single facial landmark in normalized image coordinates ([0, 1])
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "(f32, f32)", into = "(f32, f32)")]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
}

impl LandmarkPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point, scaled per axis
    pub fn distance_scaled(&self, other: &LandmarkPoint, sx: f64, sy: f64) -> f64 {
        let dx = (self.x as f64 - other.x as f64) * sx;
        let dy = (self.y as f64 - other.y as f64) * sy;
        (dx * dx + dy * dy).sqrt()
    }

    /// Euclidean distance to another point in normalized space
    pub fn distance(&self, other: &LandmarkPoint) -> f64 {
        self.distance_scaled(other, 1.0, 1.0)
    }
}

impl From<(f32, f32)> for LandmarkPoint {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<LandmarkPoint> for (f32, f32) {
    fn from(p: LandmarkPoint) -> Self {
        (p.x, p.y)
    }
}

/// Produces facial landmarks for still images.
///
/// `Ok(None)` means the detector ran but found no face. Errors are reserved
/// for failures to read or process the image itself.
pub trait LandmarkSource {
    fn detect(&mut self, image: &Path) -> Result<Option<Vec<LandmarkPoint>>, LandmarkError>;
}

impl<S: LandmarkSource + ?Sized> LandmarkSource for Box<S> {
    fn detect(&mut self, image: &Path) -> Result<Option<Vec<LandmarkPoint>>, LandmarkError> {
        (**self).detect(image)
    }
}
