//! End-to-end evaluation runs with deterministic landmark sources.

use dms::fixtures::face_with_ear;
use dms::{DmsConfig, ManualClock};
use evaluation::{
    Dataset, DetectionFailure, EvaluationError, EvaluationReport, Evaluator, SampleOutcome,
    DROWSY_DIR, NON_DROWSY_DIR,
};
use landmarks::{LandmarkError, LandmarkPoint, LandmarkSource, SidecarSource};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

enum Canned {
    Face(f64),
    NoFace,
    Short,
    Broken,
}

/// Landmark source answering from a fixed table
struct StubSource {
    faces: HashMap<PathBuf, Canned>,
}

impl StubSource {
    fn new(entries: Vec<(&str, Canned)>) -> Self {
        Self {
            faces: entries
                .into_iter()
                .map(|(name, canned)| (PathBuf::from(name), canned))
                .collect(),
        }
    }
}

impl LandmarkSource for StubSource {
    fn detect(&mut self, image: &Path) -> Result<Option<Vec<LandmarkPoint>>, LandmarkError> {
        match self.faces.get(image) {
            Some(Canned::Face(ear)) => Ok(Some(face_with_ear(*ear))),
            Some(Canned::Short) => Ok(Some(vec![LandmarkPoint::default(); 100])),
            Some(Canned::Broken) => Err(LandmarkError::ImageRead {
                path: image.to_path_buf(),
                reason: "truncated file".into(),
            }),
            Some(Canned::NoFace) | None => Ok(None),
        }
    }
}

fn sample_set() -> (Vec<(&'static str, Canned)>, Vec<PathBuf>, Vec<bool>) {
    let entries = vec![
        ("d1.jpg", Canned::Face(0.05)), // TP
        ("d2.jpg", Canned::Face(0.10)), // TP
        ("d3.jpg", Canned::Face(0.50)), // FN
        ("d4.jpg", Canned::NoFace),     // FN (failed)
        ("n1.jpg", Canned::Face(0.60)), // TN
        ("n2.jpg", Canned::Face(0.55)), // TN
        ("n3.jpg", Canned::Face(0.15)), // FP
        ("n4.jpg", Canned::Short),      // TN (failed)
    ];
    let paths = entries.iter().map(|(n, _)| PathBuf::from(n)).collect();
    let labels = vec![true, true, true, true, false, false, false, false];
    (entries, paths, labels)
}

fn evaluator(entries: Vec<(&str, Canned)>) -> Evaluator<StubSource, ManualClock> {
    Evaluator::with_clock(
        StubSource::new(entries),
        &DmsConfig::default(),
        ManualClock::with_step(0.0, 0.004),
    )
    .unwrap()
}

#[test]
fn test_metrics_for_known_predictions() {
    let (entries, paths, labels) = sample_set();
    let metrics = evaluator(entries).run(&paths, &labels).unwrap();

    let cm = metrics.confusion_matrix;
    assert_eq!(cm.true_positives(), 2);
    assert_eq!(cm.false_negatives(), 2);
    assert_eq!(cm.true_negatives(), 3);
    assert_eq!(cm.false_positives(), 1);
    assert_eq!(metrics.failed_detections, 2);
    assert!((metrics.failed_detection_rate - 0.25).abs() < 1e-12);

    assert!((metrics.accuracy - 5.0 / 8.0).abs() < 1e-12);
    assert!((metrics.precision - 2.0 / 3.0).abs() < 1e-12);
    assert!((metrics.recall - 0.5).abs() < 1e-12);
    assert!((metrics.f1 - 4.0 / 7.0).abs() < 1e-12);
}

#[test]
fn test_confusion_matrix_covers_every_image() {
    let (entries, paths, labels) = sample_set();
    let metrics = evaluator(entries).run(&paths, &labels).unwrap();

    let cm = metrics.confusion_matrix;
    let total = cm.true_positives() + cm.false_positives() + cm.false_negatives() + cm.true_negatives();
    assert_eq!(total, metrics.total_images);
    assert_eq!(total, paths.len());
    let expected = (cm.true_positives() + cm.true_negatives()) as f64 / total as f64;
    assert!((metrics.accuracy - expected).abs() < 1e-12);
}

#[test]
fn test_runs_are_reproducible() {
    let (entries_a, paths, labels) = sample_set();
    let (entries_b, _, _) = sample_set();

    let first = evaluator(entries_a).run(&paths, &labels).unwrap();
    let second = evaluator(entries_b).run(&paths, &labels).unwrap();
    assert_eq!(first, second);

    let timing = first.inference_time_ms.as_ref().unwrap();
    assert_eq!(timing.count, 6);
    assert!((timing.mean - 4.0).abs() < 1e-9);
    assert!((first.approx_fps.unwrap() - 250.0).abs() < 1e-6);
}

#[test]
fn test_failed_detections_predict_non_drowsy() {
    let (entries, paths, labels) = sample_set();
    let mut eval = evaluator(entries);
    eval.run(&paths, &labels).unwrap();

    let failed: Vec<_> = eval.records().iter().filter(|r| r.is_failed_detection()).collect();
    assert_eq!(failed.len(), 2);
    assert!(failed.iter().all(|r| !r.predicted));

    assert_eq!(
        failed[0].outcome,
        SampleOutcome::Failed {
            failure: DetectionFailure::NoFace
        }
    );
    assert_eq!(
        failed[1].outcome,
        SampleOutcome::Failed {
            failure: DetectionFailure::InsufficientLandmarks {
                found: 100,
                required: 388
            }
        }
    );
}

#[test]
fn test_source_errors_count_as_failed_detections() {
    let mut eval = evaluator(vec![("a.jpg", Canned::Broken), ("b.jpg", Canned::Face(0.05))]);
    let metrics = eval
        .run(&[PathBuf::from("a.jpg"), PathBuf::from("b.jpg")], &[true, true])
        .unwrap();

    assert_eq!(metrics.failed_detections, 1);
    assert_eq!(metrics.confusion_matrix.false_negatives(), 1);
    assert!(matches!(
        &eval.records()[0].outcome,
        SampleOutcome::Failed {
            failure: DetectionFailure::Source(_)
        }
    ));
}

#[test]
fn test_no_smoothing_state_between_images() {
    // An open image followed by a closed one: without a reset the EMA would
    // hold the second image above the closed threshold.
    let mut eval = evaluator(vec![("open.jpg", Canned::Face(0.6)), ("closed.jpg", Canned::Face(0.05))]);
    eval.run(
        &[PathBuf::from("open.jpg"), PathBuf::from("closed.jpg")],
        &[false, true],
    )
    .unwrap();

    let closed = eval.records()[1].analysis().unwrap();
    assert!(closed.eyes_closed);
    assert!((closed.ear_average - 0.05).abs() < 1e-5);
}

#[test]
fn test_ear_distribution_by_class() {
    let (entries, paths, labels) = sample_set();
    let metrics = evaluator(entries).run(&paths, &labels).unwrap();

    let drowsy = metrics.ear.drowsy.as_ref().unwrap();
    let alert = metrics.ear.non_drowsy.as_ref().unwrap();
    assert_eq!(drowsy.count, 3);
    assert_eq!(alert.count, 3);
    assert!((drowsy.mean - (0.05 + 0.10 + 0.50) / 3.0).abs() < 1e-5);
    assert!((alert.mean - (0.60 + 0.55 + 0.15) / 3.0).abs() < 1e-5);
    assert!((metrics.ear.separability.unwrap() - (alert.mean - drowsy.mean).abs()).abs() < 1e-12);
    assert_eq!(metrics.closed_threshold, 0.20);
}

#[test]
fn test_rejects_mismatched_labels() {
    let mut eval = evaluator(vec![]);
    let result = eval.run(&[PathBuf::from("a.jpg")], &[true, false]);
    assert!(matches!(
        result,
        Err(EvaluationError::LabelMismatch { images: 1, labels: 2 })
    ));
}

#[test]
fn test_rejects_empty_run() {
    let mut eval = evaluator(vec![]);
    assert!(matches!(eval.run(&[], &[]), Err(EvaluationError::EmptyDataset)));
}

fn write_sample(dir: &Path, name: &str, landmarks: Option<Vec<LandmarkPoint>>) {
    std::fs::write(dir.join(name), b"").unwrap();
    let sidecar = serde_json::json!({ "landmarks": landmarks });
    std::fs::write(
        SidecarSource::sidecar_path(&dir.join(name)),
        serde_json::to_vec(&sidecar).unwrap(),
    )
    .unwrap();
}

#[test]
fn test_dataset_with_sidecar_landmarks() {
    let root = tempfile::tempdir().unwrap();
    let drowsy = root.path().join(DROWSY_DIR);
    let alert = root.path().join(NON_DROWSY_DIR);
    std::fs::create_dir(&drowsy).unwrap();
    std::fs::create_dir(&alert).unwrap();

    write_sample(&drowsy, "001.jpg", Some(face_with_ear(0.08)));
    write_sample(&drowsy, "002.jpg", None);
    write_sample(&alert, "101.png", Some(face_with_ear(0.45)));
    std::fs::write(alert.join("102.png"), b"").unwrap(); // no sidecar at all

    let dataset = Dataset::load(root.path(), None).unwrap();
    assert_eq!(dataset.len(), 4);

    let config = DmsConfig::default();
    let mut eval = Evaluator::with_clock(SidecarSource::new(), &config, ManualClock::with_step(0.0, 0.001))
        .unwrap()
        .with_progress_every(2);
    let metrics = eval.run_dataset(&dataset).unwrap();

    assert_eq!(metrics.total_images, 4);
    assert_eq!(metrics.failed_detections, 2);
    assert_eq!(metrics.confusion_matrix.true_positives(), 1);
    assert_eq!(metrics.confusion_matrix.false_negatives(), 1);
    assert_eq!(metrics.confusion_matrix.true_negatives(), 2);

    let report = EvaluationReport::new(config, metrics.clone(), eval.records().to_vec())
        .with_dataset_root(root.path());
    let out = root.path().join("report.json");
    report.write_json(&out).unwrap();

    let restored = EvaluationReport::read_json(&out).unwrap();
    assert_eq!(restored.metrics.confusion_matrix, metrics.confusion_matrix);
    assert_eq!(restored.metrics.failed_detections, 2);
    assert!((restored.metrics.accuracy - metrics.accuracy).abs() < 1e-12);
    assert_eq!(restored.config, DmsConfig::default());
    assert_eq!(restored.ear_values(true).len(), 1);
    assert_eq!(restored.inference_times().len(), 2);
}
