//! Batch replay of a labeled dataset through the closure analyzer

use crate::dataset::Dataset;
use crate::metrics::Metrics;
use crate::EvaluationError;
use dms::{AnalysisResult, Clock, ClosureAnalyzer, DmsConfig, MonotonicClock};
use landmarks::LandmarkSource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default progress logging interval (images)
pub const DEFAULT_PROGRESS_EVERY: usize = 100;

/// Why an image produced no analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum DetectionFailure {
    /// The landmark source found no face
    NoFace,
    /// Landmarks did not cover the eye indices
    InsufficientLandmarks { found: usize, required: usize },
    /// The landmark source failed on this image
    Source(String),
}

/// Outcome of one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SampleOutcome {
    Detected(AnalysisResult),
    Failed { failure: DetectionFailure },
}

/// Per-image evaluation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub path: PathBuf,
    /// Ground truth (`true` = drowsy)
    pub true_label: bool,
    /// Predicted eyes-closed; failed detections default to `false`
    pub predicted: bool,
    pub outcome: SampleOutcome,
}

impl SampleRecord {
    pub fn analysis(&self) -> Option<&AnalysisResult> {
        match &self.outcome {
            SampleOutcome::Detected(result) => Some(result),
            SampleOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed_detection(&self) -> bool {
        self.analysis().is_none()
    }
}

/// Offline evaluator.
///
/// Each image is scored independently: the smoother is reset before every
/// image, so no state carries over between samples.
pub struct Evaluator<S, C = MonotonicClock> {
    source: S,
    analyzer: ClosureAnalyzer,
    clock: C,
    progress_every: usize,
    records: Vec<SampleRecord>,
}

impl<S: LandmarkSource> Evaluator<S, MonotonicClock> {
    pub fn new(source: S, config: &DmsConfig) -> Result<Self, EvaluationError> {
        Self::with_clock(source, config, MonotonicClock::new())
    }
}

impl<S: LandmarkSource, C: Clock> Evaluator<S, C> {
    /// Create an evaluator timing inference with `clock`
    pub fn with_clock(source: S, config: &DmsConfig, clock: C) -> Result<Self, EvaluationError> {
        Ok(Self {
            source,
            analyzer: ClosureAnalyzer::new(config)?,
            clock,
            progress_every: DEFAULT_PROGRESS_EVERY,
            records: Vec::new(),
        })
    }

    /// Log progress every `n` images (0 disables)
    pub fn with_progress_every(mut self, n: usize) -> Self {
        self.progress_every = n;
        self
    }

    /// Evaluate every image against its label and compute metrics
    pub fn run(
        &mut self,
        image_paths: &[PathBuf],
        true_labels: &[bool],
    ) -> Result<Metrics, EvaluationError> {
        if image_paths.len() != true_labels.len() {
            return Err(EvaluationError::LabelMismatch {
                images: image_paths.len(),
                labels: true_labels.len(),
            });
        }
        if image_paths.is_empty() {
            return Err(EvaluationError::EmptyDataset);
        }

        let total = image_paths.len();
        info!("Evaluating {} images", total);
        self.records.clear();
        self.records.reserve(total);

        for (i, (path, &label)) in image_paths.iter().zip(true_labels).enumerate() {
            let record = self.evaluate_image(path, label);
            self.records.push(record);

            if self.progress_every > 0 && (i + 1) % self.progress_every == 0 {
                info!("Processed {}/{} images", i + 1, total);
            }
        }

        let metrics = Metrics::from_records(&self.records, self.analyzer.closed_threshold());
        info!(
            "Evaluation finished: {} images, {} failed detections ({:.2}%)",
            metrics.total_images,
            metrics.failed_detections,
            metrics.failed_detection_rate * 100.0
        );
        Ok(metrics)
    }

    /// Evaluate a dataset loaded from disk
    pub fn run_dataset(&mut self, dataset: &Dataset) -> Result<Metrics, EvaluationError> {
        self.run(&dataset.images, &dataset.labels)
    }

    /// Records of the last run, in input order
    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    pub fn closed_threshold(&self) -> f64 {
        self.analyzer.closed_threshold()
    }

    fn evaluate_image(&mut self, path: &Path, true_label: bool) -> SampleRecord {
        self.analyzer.reset();
        let start = self.clock.now_seconds();

        let outcome = match self.source.detect(path) {
            Ok(Some(points)) => match self.analyzer.analyze(&points) {
                Some(reading) => {
                    let elapsed_ms = (self.clock.now_seconds() - start) * 1000.0;
                    debug!(
                        "{}: EAR {:.3} closed={} ({:.2} ms)",
                        path.display(),
                        reading.smoothed,
                        reading.eyes_closed,
                        elapsed_ms
                    );
                    SampleOutcome::Detected(AnalysisResult::new(reading, elapsed_ms))
                }
                None => SampleOutcome::Failed {
                    failure: DetectionFailure::InsufficientLandmarks {
                        found: points.len(),
                        required: self.analyzer.required_landmarks(),
                    },
                },
            },
            Ok(None) => SampleOutcome::Failed {
                failure: DetectionFailure::NoFace,
            },
            Err(e) => {
                warn!("Landmark detection failed for {}: {}", path.display(), e);
                SampleOutcome::Failed {
                    failure: DetectionFailure::Source(e.to_string()),
                }
            }
        };

        let predicted = match &outcome {
            SampleOutcome::Detected(result) => result.eyes_closed,
            SampleOutcome::Failed { failure } => {
                debug!("{}: failed detection ({:?})", path.display(), failure);
                false
            }
        };

        SampleRecord {
            path: path.to_path_buf(),
            true_label,
            predicted,
            outcome,
        }
    }
}
