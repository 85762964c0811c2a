//! Layered run configuration
//!
//! Lowest to highest priority:
//! 1. Built-in defaults (optionally a strict/lenient preset)
//! 2. TOML file given with `--config`
//! 3. `DROWSY__*` environment variables (`DROWSY__DMS__SMOOTHING_ALPHA=0.4`)
//! 4. Command-line flags, applied by each command

use anyhow::{Context, Result};
use clap::ValueEnum;
use config::{Config, Environment, File, FileFormat};
use dms::DmsConfig;
use evaluation::{DEFAULT_MAX_PER_CLASS, DEFAULT_PROGRESS_EVERY};
use landmarks::FaceMeshConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DROWSY";

/// Threshold preset used as the base layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    #[default]
    Default,
    /// Lower PERCLOS thresholds (0.10 / 0.30)
    Strict,
    /// Higher PERCLOS thresholds (0.20 / 0.50)
    Lenient,
}

impl Preset {
    fn dms(self) -> DmsConfig {
        match self {
            Preset::Default => DmsConfig::default(),
            Preset::Strict => DmsConfig::strict(),
            Preset::Lenient => DmsConfig::lenient(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    pub max_per_class: usize,
    pub progress_every: usize,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            max_per_class: DEFAULT_MAX_PER_CLASS,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dms: DmsConfig,
    pub face_mesh: FaceMeshConfig,
    pub evaluation: EvaluationSettings,
}

impl Settings {
    /// Load settings from the process environment and an optional file
    pub fn load(path: Option<&Path>, preset: Preset) -> Result<Self> {
        Self::load_with_env(path, preset, None)
    }

    /// Load settings, reading environment variables from `env` instead of
    /// the process environment when given
    pub fn load_with_env(
        path: Option<&Path>,
        preset: Preset,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let base = Settings {
            dms: preset.dms(),
            ..Settings::default()
        };

        let mut builder = Config::builder()
            .add_source(Config::try_from(&base).context("Failed to encode default settings")?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let settings = builder
            .build()
            .and_then(|config| config.try_deserialize::<Settings>())
            .with_context(|| match path {
                Some(p) => format!("Failed to load configuration from {}", p.display()),
                None => "Failed to load configuration".to_string(),
            })?;

        settings.dms.validate().context("Invalid DMS configuration")?;
        Ok(settings)
    }
}
