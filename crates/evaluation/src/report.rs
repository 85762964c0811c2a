//! Report data handed to the external report renderer

use crate::evaluator::SampleRecord;
use crate::metrics::Metrics;
use crate::EvaluationError;
use chrono::{DateTime, Utc};
use dms::DmsConfig;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything needed to render the evaluation report: metrics for the
/// summary pages plus per-sample values for the distribution charts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_root: Option<PathBuf>,
    pub config: DmsConfig,
    pub metrics: Metrics,
    pub samples: Vec<SampleRecord>,
}

impl EvaluationReport {
    pub fn new(config: DmsConfig, metrics: Metrics, samples: Vec<SampleRecord>) -> Self {
        Self {
            generated_at: Utc::now(),
            dataset_root: None,
            config,
            metrics,
            samples,
        }
    }

    pub fn with_dataset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.dataset_root = Some(root.into());
        self
    }

    /// Smoothed EAR values of successful detections for one class
    pub fn ear_values(&self, drowsy: bool) -> Vec<f64> {
        self.samples
            .iter()
            .filter(|s| s.true_label == drowsy)
            .filter_map(|s| s.analysis().map(|a| a.ear_average))
            .collect()
    }

    /// Inference times of successful detections
    pub fn inference_times(&self) -> Vec<f64> {
        self.samples
            .iter()
            .filter_map(|s| s.analysis().map(|a| a.inference_time_ms))
            .collect()
    }

    /// Write the report as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<(), EvaluationError> {
        let mut writer = BufWriter::new(std::fs::File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        info!("Report data written to {}", path.display());
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self, EvaluationError> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}
