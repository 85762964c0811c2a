//! Precomputed landmarks stored next to each image
//!
//! `photo.jpg` is paired with `photo.landmarks.json`:
//!
//! ```json
//! { "landmarks": [[0.41, 0.37], [0.42, 0.38], ...] }
//! ```
//!
//! `"landmarks": null` or a missing sidecar file means no face was found.

use crate::{LandmarkError, LandmarkPoint, LandmarkSource};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const SIDECAR_SUFFIX: &str = "landmarks.json";

#[derive(Debug, Deserialize)]
struct SidecarFile {
    landmarks: Option<Vec<LandmarkPoint>>,
}

/// Landmark source backed by sidecar JSON files
#[derive(Debug, Default, Clone)]
pub struct SidecarSource;

impl SidecarSource {
    pub fn new() -> Self {
        Self
    }

    /// Path of the sidecar file for an image
    pub fn sidecar_path(image: &Path) -> PathBuf {
        image.with_extension(SIDECAR_SUFFIX)
    }
}

impl LandmarkSource for SidecarSource {
    fn detect(&mut self, image: &Path) -> Result<Option<Vec<LandmarkPoint>>, LandmarkError> {
        let path = Self::sidecar_path(image);
        if !path.exists() {
            debug!("No sidecar for {}", image.display());
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&path)?;
        let parsed: SidecarFile =
            serde_json::from_str(&raw).map_err(|e| LandmarkError::InvalidData {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        Ok(parsed.landmarks)
    }
}
