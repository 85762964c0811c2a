//! Driver alertness states and PERCLOS classification

use crate::DmsError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// PERCLOS fraction at which the driver is considered drowsy
pub const WARNING_THRESHOLD: f64 = 0.15;

/// PERCLOS fraction at which a microsleep is reported
pub const DANGER_THRESHOLD: f64 = 0.40;

/// Alertness state, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum DrowsinessState {
    #[default]
    Attentive,
    Drowsy,
    Microsleep,
}

impl DrowsinessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrowsinessState::Attentive => "Attentive",
            DrowsinessState::Drowsy => "Drowsy",
            DrowsinessState::Microsleep => "Microsleep",
        }
    }
}

impl fmt::Display for DrowsinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered `(minimum_percentage, state)` table.
///
/// Rungs are kept sorted by descending minimum and evaluated top-down; the
/// first rung whose minimum is `<= p` wins. Anything below every rung is
/// [`DrowsinessState::Attentive`]. Serialized as the bare rung list;
/// deserialization goes through [`ThresholdLadder::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<(f64, DrowsinessState)>",
    into = "Vec<(f64, DrowsinessState)>"
)]
pub struct ThresholdLadder {
    rungs: Vec<(f64, DrowsinessState)>,
}

impl ThresholdLadder {
    pub fn new(mut rungs: Vec<(f64, DrowsinessState)>) -> Result<Self, DmsError> {
        if rungs.iter().any(|(min, _)| !min.is_finite()) {
            return Err(DmsError::Config("ladder thresholds must be finite".into()));
        }
        rungs.sort_by(|a, b| b.0.total_cmp(&a.0));

        // Higher minimum must never map to a milder state
        if rungs.windows(2).any(|w| w[0].1 < w[1].1) {
            return Err(DmsError::Config("ladder states must rise with their thresholds".into()));
        }
        Ok(Self { rungs })
    }

    /// Ladder with the drowsy/microsleep cut points
    pub fn with_thresholds(warning: f64, danger: f64) -> Result<Self, DmsError> {
        if warning >= danger {
            return Err(DmsError::Config(format!(
                "warning threshold ({}) must be below danger threshold ({})",
                warning, danger
            )));
        }
        Self::new(vec![
            (danger, DrowsinessState::Microsleep),
            (warning, DrowsinessState::Drowsy),
        ])
    }

    pub fn classify(&self, percentage: f64) -> DrowsinessState {
        self.rungs
            .iter()
            .find(|(min, _)| percentage >= *min)
            .map(|(_, state)| *state)
            .unwrap_or(DrowsinessState::Attentive)
    }

    /// Lowest threshold of any non-attentive state
    pub fn warning_threshold(&self) -> f64 {
        self.rungs
            .iter()
            .filter(|(_, s)| *s != DrowsinessState::Attentive)
            .map(|(min, _)| *min)
            .fold(f64::INFINITY, f64::min)
    }

    /// Threshold of the most severe state
    pub fn danger_threshold(&self) -> f64 {
        self.rungs.first().map(|(min, _)| *min).unwrap_or(f64::INFINITY)
    }

    pub fn rungs(&self) -> &[(f64, DrowsinessState)] {
        &self.rungs
    }
}

impl Default for ThresholdLadder {
    fn default() -> Self {
        Self {
            rungs: vec![
                (DANGER_THRESHOLD, DrowsinessState::Microsleep),
                (WARNING_THRESHOLD, DrowsinessState::Drowsy),
            ],
        }
    }
}

impl TryFrom<Vec<(f64, DrowsinessState)>> for ThresholdLadder {
    type Error = DmsError;

    fn try_from(rungs: Vec<(f64, DrowsinessState)>) -> Result<Self, Self::Error> {
        Self::new(rungs)
    }
}

impl From<ThresholdLadder> for Vec<(f64, DrowsinessState)> {
    fn from(ladder: ThresholdLadder) -> Self {
        ladder.rungs
    }
}

/// Classify a PERCLOS fraction with the default ladder
pub fn classify(percentage: f64) -> DrowsinessState {
    ThresholdLadder::default().classify(percentage)
}

/// Current PERCLOS reading as exposed to displays and loggers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: DrowsinessState,
    /// Fraction of closed samples in the window, in [0, 1]
    pub perclos: f64,
    /// `perclos * 100`
    pub perclos_percentage: f64,
    pub is_warning: bool,
    pub is_danger: bool,
    pub samples_in_window: usize,
    pub window_seconds: f64,
}
