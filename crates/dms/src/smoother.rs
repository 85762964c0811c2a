//! Exponential moving average for the EAR signal

use crate::DmsError;

/// Stateful EMA filter.
///
/// The first sample after construction or [`reset`](Self::reset) passes
/// through unchanged; later samples move the value by `alpha * (x - value)`.
#[derive(Debug, Clone)]
pub struct EarSmoother {
    alpha: f64,
    current: Option<f64>,
}

impl EarSmoother {
    /// Create a smoother with factor `alpha` in (0, 1]
    pub fn new(alpha: f64) -> Result<Self, DmsError> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(DmsError::Config(format!(
                "smoothing alpha must be in (0, 1], got {}",
                alpha
            )));
        }
        Ok(Self {
            alpha,
            current: None,
        })
    }

    /// Feed a sample and get the smoothed output
    pub fn update(&mut self, value: f64) -> f64 {
        let next = match self.current {
            None => value,
            Some(current) => current + self.alpha * (value - current),
        };
        self.current = Some(next);
        next
    }

    /// Forget all history
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Last smoothed value, if any sample was seen since the last reset
    pub fn value(&self) -> Option<f64> {
        self.current
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_sample_passes_through() {
        let mut smoother = EarSmoother::new(0.3).unwrap();
        assert_eq!(smoother.value(), None);
        assert_eq!(smoother.update(0.25), 0.25);
    }

    #[test]
    fn test_exponential_update() {
        let mut smoother = EarSmoother::new(0.5).unwrap();
        smoother.update(0.4);
        // 0.4 + 0.5 * (0.0 - 0.4)
        assert!((smoother.update(0.0) - 0.2).abs() < 1e-12);
        // 0.2 + 0.5 * (0.0 - 0.2)
        assert!((smoother.update(0.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_alpha_one_tracks_input() {
        let mut smoother = EarSmoother::new(1.0).unwrap();
        smoother.update(0.3);
        assert_eq!(smoother.update(0.1), 0.1);
    }

    #[test]
    fn test_spike_is_damped() {
        let mut smoother = EarSmoother::new(0.3).unwrap();
        for _ in 0..10 {
            smoother.update(0.3);
        }
        let out = smoother.update(0.0);
        assert!(out > 0.2, "single closed frame should not collapse the signal: {}", out);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut smoother = EarSmoother::new(0.3).unwrap();
        smoother.update(0.3);
        smoother.update(0.2);
        smoother.reset();
        assert_eq!(smoother.value(), None);
        assert_eq!(smoother.update(0.05), 0.05);
    }

    #[test]
    fn test_rejects_invalid_alpha() {
        assert!(EarSmoother::new(0.0).is_err());
        assert!(EarSmoother::new(1.01).is_err());
        assert!(EarSmoother::new(f64::NAN).is_err());
    }

    proptest! {
        #[test]
        fn prop_reset_then_update_is_identity(
            alpha in 0.001f64..=1.0,
            history in prop::collection::vec(0.0f64..1.0, 0..20),
            x in 0.0f64..1.0,
        ) {
            let mut smoother = EarSmoother::new(alpha).unwrap();
            for v in history {
                smoother.update(v);
            }
            smoother.reset();
            prop_assert_eq!(smoother.update(x), x);
        }

        #[test]
        fn prop_output_stays_within_input_range(
            alpha in 0.001f64..=1.0,
            samples in prop::collection::vec(0.0f64..1.0, 1..50),
        ) {
            let mut smoother = EarSmoother::new(alpha).unwrap();
            let lo = samples.iter().cloned().fold(f64::MAX, f64::min);
            let hi = samples.iter().cloned().fold(f64::MIN, f64::max);
            for v in samples {
                let out = smoother.update(v);
                prop_assert!(out >= lo - 1e-12 && out <= hi + 1e-12);
            }
        }
    }
}
