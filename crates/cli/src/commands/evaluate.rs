//! Evaluate command - score a labeled dataset

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use evaluation::{Dataset, EvaluationReport, Evaluator};
use landmarks::{FaceMeshSource, LandmarkSource, SidecarSource};
use tracing::info;

use super::parse_unit_interval;
use crate::settings::Settings;

/// Where image landmarks come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LandmarkBackend {
    /// Precomputed `<image>.landmarks.json` files
    #[default]
    Sidecar,
    /// ONNX face-mesh model
    Model,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Dataset root containing `Drowsy/` and `Non Drowsy/`
    #[arg(long, value_name = "DIR")]
    pub dataset: PathBuf,

    /// Landmark backend
    #[arg(long, value_enum, default_value_t = LandmarkBackend::Sidecar)]
    pub landmarks: LandmarkBackend,

    /// Face-mesh ONNX model (with `--landmarks model`)
    #[arg(long, value_name = "ONNX")]
    pub model: Option<PathBuf>,

    /// Maximum images loaded per class
    #[arg(long, value_name = "N")]
    pub max_per_class: Option<usize>,

    /// Log progress every N images (0 disables)
    #[arg(long, value_name = "N")]
    pub progress_every: Option<usize>,

    /// Smoothed EAR below which an image counts as eyes closed
    #[arg(long, value_parser = parse_unit_interval)]
    pub closed_threshold: Option<f64>,

    /// Write the full evaluation report as JSON
    #[arg(long, value_name = "JSON")]
    pub report: Option<PathBuf>,
}

pub fn run(args: &EvaluateArgs, settings: Settings) -> Result<()> {
    let Settings {
        mut dms,
        mut face_mesh,
        evaluation,
    } = settings;

    if let Some(threshold) = args.closed_threshold {
        dms.closed_threshold = threshold;
    }
    let max_per_class = args.max_per_class.unwrap_or(evaluation.max_per_class);
    let progress_every = args.progress_every.unwrap_or(evaluation.progress_every);

    let dataset = Dataset::load(&args.dataset, Some(max_per_class))
        .with_context(|| format!("Failed to load dataset {}", args.dataset.display()))?;

    let source: Box<dyn LandmarkSource> = match args.landmarks {
        LandmarkBackend::Sidecar => Box::new(SidecarSource::new()),
        LandmarkBackend::Model => {
            if let Some(model) = &args.model {
                face_mesh.model_path = model.clone();
            }
            Box::new(FaceMeshSource::new(face_mesh).context("Failed to load face-mesh model")?)
        }
    };
    info!("Using {:?} landmarks", args.landmarks);

    let mut evaluator = Evaluator::new(source, &dms)?.with_progress_every(progress_every);
    let metrics = evaluator.run_dataset(&dataset)?;

    println!("{metrics}");

    if let Some(path) = &args.report {
        EvaluationReport::new(dms, metrics, evaluator.records().to_vec())
            .with_dataset_root(&dataset.root)
            .write_json(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}
