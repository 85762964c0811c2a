//! Classification metrics for a full evaluation run
//!
//! "Positive" means drowsy (eyes closed). Precision, recall and F1 are
//! defined as `0.0` when their denominator is empty.

use crate::evaluator::SampleRecord;
use crate::statistics::DistributionStats;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Class order used by the confusion matrix rows and columns
pub const CLASS_NAMES: [&str; 2] = ["Non Drowsy", "Drowsy"];

/// 2x2 confusion matrix: rows = true label, columns = predicted label,
/// both ordered Non-drowsy, Drowsy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub counts: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    /// Update with a single prediction
    pub fn record(&mut self, actual: bool, predicted: bool) {
        self.counts[actual as usize][predicted as usize] += 1;
    }

    pub fn true_negatives(&self) -> usize {
        self.counts[0][0]
    }

    pub fn false_positives(&self) -> usize {
        self.counts[0][1]
    }

    pub fn false_negatives(&self) -> usize {
        self.counts[1][0]
    }

    pub fn true_positives(&self) -> usize {
        self.counts[1][1]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Accuracy = (TP + TN) / total
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives() + self.true_negatives(), self.total())
    }

    /// Precision = TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives(), self.true_positives() + self.false_positives())
    }

    /// Recall = TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives(), self.true_positives() + self.false_negatives())
    }

    /// F1 = 2 * precision * recall / (precision + recall)
    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Each row divided by its total (rows without samples stay zero)
    pub fn row_normalized(&self) -> [[f64; 2]; 2] {
        self.counts.map(|row| {
            let total: usize = row.iter().sum();
            row.map(|c| ratio(c, total))
        })
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

/// Smoothed EAR distribution split by true label
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EarDistribution {
    pub non_drowsy: Option<DistributionStats>,
    pub drowsy: Option<DistributionStats>,
    /// `|mean(non_drowsy) - mean(drowsy)|`
    pub separability: Option<f64>,
}

/// Aggregate results of an evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Images processed, failed detections included
    pub total_images: usize,
    /// Images without usable landmarks; predicted non-drowsy
    pub failed_detections: usize,
    pub failed_detection_rate: f64,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion_matrix: ConfusionMatrix,
    pub confusion_matrix_normalized: [[f64; 2]; 2],
    /// Over successful detections only
    pub inference_time_ms: Option<DistributionStats>,
    /// `1000 / mean inference time`
    pub approx_fps: Option<f64>,
    pub ear: EarDistribution,
    /// Smoothed EAR cutoff used for the closed decision
    pub closed_threshold: f64,
}

impl Metrics {
    pub fn from_records(records: &[SampleRecord], closed_threshold: f64) -> Self {
        let mut matrix = ConfusionMatrix::default();
        let mut failed = 0usize;
        let mut times = Vec::new();
        let mut ear_non_drowsy = Vec::new();
        let mut ear_drowsy = Vec::new();

        for record in records {
            matrix.record(record.true_label, record.predicted);
            match record.analysis() {
                Some(result) => {
                    times.push(result.inference_time_ms);
                    if record.true_label {
                        ear_drowsy.push(result.ear_average);
                    } else {
                        ear_non_drowsy.push(result.ear_average);
                    }
                }
                None => failed += 1,
            }
        }

        let inference_time_ms = DistributionStats::compute(&times);
        let approx_fps = inference_time_ms
            .as_ref()
            .filter(|t| t.mean > 0.0)
            .map(|t| 1000.0 / t.mean);

        let non_drowsy = DistributionStats::compute(&ear_non_drowsy);
        let drowsy = DistributionStats::compute(&ear_drowsy);
        let separability = match (&non_drowsy, &drowsy) {
            (Some(a), Some(b)) => Some((a.mean - b.mean).abs()),
            _ => None,
        };

        Self {
            total_images: records.len(),
            failed_detections: failed,
            failed_detection_rate: ratio(failed, records.len()),
            accuracy: matrix.accuracy(),
            precision: matrix.precision(),
            recall: matrix.recall(),
            f1: matrix.f1_score(),
            confusion_matrix: matrix,
            confusion_matrix_normalized: matrix.row_normalized(),
            inference_time_ms,
            approx_fps,
            ear: EarDistribution {
                non_drowsy,
                drowsy,
                separability,
            },
            closed_threshold,
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cm = &self.confusion_matrix;
        writeln!(f, "Images processed:   {}", self.total_images)?;
        writeln!(
            f,
            "Failed detections:  {} ({:.2}%)",
            self.failed_detections,
            self.failed_detection_rate * 100.0
        )?;
        writeln!(f)?;
        writeln!(f, "Classification metrics:")?;
        writeln!(f, "  Accuracy:   {:.2}%", self.accuracy * 100.0)?;
        writeln!(f, "  Precision:  {:.2}%", self.precision * 100.0)?;
        writeln!(f, "  Recall:     {:.2}%", self.recall * 100.0)?;
        writeln!(f, "  F1-Score:   {:.2}%", self.f1 * 100.0)?;
        writeln!(f)?;
        writeln!(f, "Confusion matrix (rows = true, cols = predicted):")?;
        writeln!(f, "  TN: {}, FP: {}", cm.true_negatives(), cm.false_positives())?;
        writeln!(f, "  FN: {}, TP: {}", cm.false_negatives(), cm.true_positives())?;
        writeln!(f)?;
        match &self.inference_time_ms {
            Some(t) => {
                writeln!(f, "Inference time:")?;
                writeln!(f, "  Mean:    {:.2} ms", t.mean)?;
                writeln!(f, "  Std dev: {:.2} ms", t.std_dev)?;
                writeln!(f, "  Min:     {:.2} ms", t.min)?;
                writeln!(f, "  Max:     {:.2} ms", t.max)?;
                writeln!(f, "  P50/P95: {:.2} / {:.2} ms", t.percentiles.p50, t.percentiles.p95)?;
                match self.approx_fps {
                    Some(fps) => writeln!(f, "  Approx:  {:.1} FPS", fps)?,
                    None => writeln!(f, "  Approx:  N/A")?,
                }
            }
            None => writeln!(f, "Inference time: N/A (no successful detections)")?,
        }
        if let Some(sep) = self.ear.separability {
            writeln!(f)?;
            writeln!(
                f,
                "EAR separability:   {:.4} (closed threshold {:.2})",
                sep, self.closed_threshold
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(tn: usize, fp: usize, fn_: usize, tp: usize) -> ConfusionMatrix {
        ConfusionMatrix {
            counts: [[tn, fp], [fn_, tp]],
        }
    }

    #[test]
    fn test_record_layout() {
        let mut cm = ConfusionMatrix::default();
        cm.record(true, true);
        cm.record(true, false);
        cm.record(false, true);
        cm.record(false, false);
        cm.record(false, false);

        assert_eq!(cm.true_positives(), 1);
        assert_eq!(cm.false_negatives(), 1);
        assert_eq!(cm.false_positives(), 1);
        assert_eq!(cm.true_negatives(), 2);
        assert_eq!(cm.total(), 5);
    }

    #[test]
    fn test_scores() {
        let cm = matrix(50, 10, 20, 20);
        assert!((cm.accuracy() - 0.70).abs() < 1e-12);
        assert!((cm.precision() - 20.0 / 30.0).abs() < 1e-12);
        assert!((cm.recall() - 0.5).abs() < 1e-12);
        // 2 * (2/3) * 0.5 / (2/3 + 0.5) = 4/7
        assert!((cm.f1_score() - 4.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_positive_predictions_is_zero_not_nan() {
        let cm = matrix(10, 0, 5, 0);
        assert_eq!(cm.precision(), 0.0);
        assert_eq!(cm.recall(), 0.0);
        assert_eq!(cm.f1_score(), 0.0);
    }

    #[test]
    fn test_absent_class() {
        let cm = matrix(7, 3, 0, 0);
        assert_eq!(cm.recall(), 0.0);
        assert_eq!(cm.precision(), 0.0);
        assert!((cm.accuracy() - 0.7).abs() < 1e-12);
        assert_eq!(cm.row_normalized(), [[0.7, 0.3], [0.0, 0.0]]);
    }

    #[test]
    fn test_empty_matrix() {
        let cm = ConfusionMatrix::default();
        assert_eq!(cm.accuracy(), 0.0);
        assert_eq!(cm.f1_score(), 0.0);
    }
}
