//! Labeled image dataset on disk
//!
//! ```text
//! <root>/
//!   Drowsy/        positive class
//!   Non Drowsy/    negative class
//! ```

use crate::EvaluationError;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DROWSY_DIR: &str = "Drowsy";
pub const NON_DROWSY_DIR: &str = "Non Drowsy";

/// Default cap on images loaded per class
pub const DEFAULT_MAX_PER_CLASS: usize = 500;

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Image paths with their ground-truth labels (`true` = drowsy)
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub root: PathBuf,
    pub images: Vec<PathBuf>,
    pub labels: Vec<bool>,
}

impl Dataset {
    /// Load both class directories, drowsy images first.
    ///
    /// Files are sorted by name within each class so runs are reproducible.
    pub fn load(root: &Path, max_per_class: Option<usize>) -> Result<Self, EvaluationError> {
        if !root.is_dir() {
            return Err(EvaluationError::DatasetNotFound(root.to_path_buf()));
        }

        let drowsy = list_images(&root.join(DROWSY_DIR), max_per_class)?;
        let non_drowsy = list_images(&root.join(NON_DROWSY_DIR), max_per_class)?;

        info!(
            "Dataset loaded from {}: {} drowsy, {} non-drowsy, {} total",
            root.display(),
            drowsy.len(),
            non_drowsy.len(),
            drowsy.len() + non_drowsy.len()
        );

        let mut labels = vec![true; drowsy.len()];
        labels.extend(std::iter::repeat(false).take(non_drowsy.len()));

        let mut images = drowsy;
        images.extend(non_drowsy);

        Ok(Self {
            root: root.to_path_buf(),
            images,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn drowsy_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l).count()
    }

    pub fn non_drowsy_count(&self) -> usize {
        self.len() - self.drowsy_count()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

fn list_images(dir: &Path, max: Option<usize>) -> Result<Vec<PathBuf>, EvaluationError> {
    if !dir.is_dir() {
        return Err(EvaluationError::ClassDirMissing(dir.to_path_buf()));
    }

    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image(&path) {
            images.push(path);
        }
    }
    images.sort();

    if let Some(max) = max {
        images.truncate(max);
    }
    Ok(images)
}
