//! Face-mesh landmark model (ONNX, executed with tract)

use crate::{LandmarkError, LandmarkPoint, LandmarkSource, FACE_MESH_LANDMARKS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tract_onnx::prelude::*;

type FaceMeshPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// Face-mesh model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceMeshConfig {
    /// Path to the ONNX face-mesh model
    pub model_path: PathBuf,

    /// Square input resolution expected by the model (pixels)
    pub input_size: u32,

    /// Minimum face-presence score (after sigmoid)
    pub min_face_confidence: f32,
}

impl Default for FaceMeshConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/face_landmark.onnx"),
            input_size: 192,
            min_face_confidence: 0.5,
        }
    }
}

/// Landmark source running a face-mesh model on each image.
///
/// The model takes a `1 x S x S x 3` RGB tensor in `[0, 1]` and returns the
/// landmark coordinates (x, y, z triplets in input pixels) followed by a
/// face-presence logit.
pub struct FaceMeshSource {
    config: FaceMeshConfig,
    plan: FaceMeshPlan,
}

impl FaceMeshSource {
    pub fn new(config: FaceMeshConfig) -> Result<Self, LandmarkError> {
        if !config.model_path.exists() {
            error!("Face mesh model missing at {}", config.model_path.display());
            return Err(LandmarkError::ModelNotFound(config.model_path.clone()));
        }

        info!("Loading face mesh model from {}", config.model_path.display());
        let size = config.input_size as usize;
        let plan = tract_onnx::onnx()
            .model_for_path(&config.model_path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, size, size, 3]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| {
                error!("Failed to load face mesh model: {}", e);
                LandmarkError::ModelLoad(e.to_string())
            })?;

        Ok(Self { config, plan })
    }

    fn preprocess(&self, image: &Path) -> Result<Tensor, LandmarkError> {
        let size = self.config.input_size;
        let img = image::open(image)
            .map_err(|e| LandmarkError::ImageRead {
                path: image.to_path_buf(),
                reason: e.to_string(),
            })?
            .to_rgb8();

        let resized = image::imageops::resize(&img, size, size, image::imageops::FilterType::Triangle);

        let mut input = tract_ndarray::Array4::<f32>::zeros((1, size as usize, size as usize, 3));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                input[[0, y as usize, x as usize, c]] = pixel[c] as f32 / 255.0;
            }
        }

        Ok(input.into())
    }
}

/// Turn raw model outputs into normalized landmarks.
///
/// `outputs[0]` holds x, y, z triplets in input pixels; the optional
/// `outputs[1]` holds the face-presence logit. A score below
/// `min_face_confidence` yields `Ok(None)`.
pub fn decode_outputs(
    config: &FaceMeshConfig,
    outputs: &[TValue],
) -> Result<Option<Vec<LandmarkPoint>>, LandmarkError> {
    if let Some(score) = outputs.get(1) {
        let logit = score
            .to_array_view::<f32>()
            .map_err(|e| LandmarkError::Inference(e.to_string()))?
            .iter()
            .next()
            .copied()
            .unwrap_or(f32::NEG_INFINITY);
        let confidence = 1.0 / (1.0 + (-logit).exp());
        if confidence < config.min_face_confidence {
            debug!("Face score {:.3} below {:.3}", confidence, config.min_face_confidence);
            return Ok(None);
        }
    }

    let coords = outputs
        .first()
        .ok_or_else(|| LandmarkError::Inference("model produced no outputs".into()))?
        .to_array_view::<f32>()
        .map_err(|e| LandmarkError::Inference(e.to_string()))?;
    let flat: Vec<f32> = coords.iter().copied().collect();

    if flat.len() < FACE_MESH_LANDMARKS * 3 {
        return Err(LandmarkError::Inference(format!(
            "expected {} landmark values, got {}",
            FACE_MESH_LANDMARKS * 3,
            flat.len()
        )));
    }

    let scale = config.input_size as f32;
    let points = flat
        .chunks_exact(3)
        .map(|xyz| LandmarkPoint::new(xyz[0] / scale, xyz[1] / scale))
        .collect();

    Ok(Some(points))
}

impl LandmarkSource for FaceMeshSource {
    fn detect(&mut self, image: &Path) -> Result<Option<Vec<LandmarkPoint>>, LandmarkError> {
        let input = self.preprocess(image)?;
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| LandmarkError::Inference(e.to_string()))?;
        decode_outputs(&self.config, &outputs)
    }
}
