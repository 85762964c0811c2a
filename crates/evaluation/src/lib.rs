//! Offline Drowsiness Evaluation
//!
//! Replays a labeled image dataset through the closure analyzer and scores
//! the predictions:
//! - Dataset loading (`Drowsy/`, `Non Drowsy/`)
//! - Per-image detection with failed-detection accounting
//! - Accuracy, precision, recall, F1 and confusion matrix
//! - Inference-time and EAR distribution statistics
//! - JSON report data for external rendering

pub mod dataset;
pub mod evaluator;
pub mod metrics;
pub mod report;
pub mod statistics;

pub use dataset::{Dataset, DEFAULT_MAX_PER_CLASS, DROWSY_DIR, NON_DROWSY_DIR};
pub use evaluator::{
    DetectionFailure, Evaluator, SampleOutcome, SampleRecord, DEFAULT_PROGRESS_EVERY,
};
pub use metrics::{ConfusionMatrix, EarDistribution, Metrics};
pub use report::EvaluationReport;
pub use statistics::{DistributionStats, Percentiles};

use std::path::PathBuf;
use thiserror::Error;

/// Evaluation error types
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Dataset not found: {0}")]
    DatasetNotFound(PathBuf),

    #[error("Class directory missing: {0}")]
    ClassDirMissing(PathBuf),

    #[error("Dataset is empty")]
    EmptyDataset,

    #[error("{images} images but {labels} labels")]
    LabelMismatch { images: usize, labels: usize },

    #[error(transparent)]
    Dms(#[from] dms::DmsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
