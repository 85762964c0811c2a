//! Real-time drowsiness monitoring session
//!
//! Landmark frame -> EAR -> EMA -> PERCLOS window -> alertness state, one
//! frame at a time. A monitor owns all of its signal state; use one monitor
//! per camera stream.

use crate::clock::{Clock, MonotonicClock};
use crate::config::{DmsConfig, PerclosInput};
use crate::ear::EyeFeatureExtractor;
use crate::perclos::PerclosAccumulator;
use crate::smoother::EarSmoother;
use crate::state::StatusSnapshot;
use crate::DmsError;
use landmarks::{LandmarkFrame, LandmarkPoint};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Consecutive face-less frames before the camera is reported as blocked
pub const FACE_ABSENT_WARN_FRAMES: u32 = 30;

/// Result of feeding one frame to the monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FrameOutcome {
    /// Frame accepted; new status
    Updated(StatusSnapshot),
    /// No face in the frame; nothing updated
    NoFace,
    /// Landmark set too short for the eye indices; nothing updated
    InsufficientLandmarks { found: usize, required: usize },
}

impl FrameOutcome {
    pub fn status(&self) -> Option<&StatusSnapshot> {
        match self {
            FrameOutcome::Updated(status) => Some(status),
            _ => None,
        }
    }
}

/// Driver monitoring session
pub struct DrowsinessMonitor<C = MonotonicClock> {
    config: DmsConfig,
    extractor: EyeFeatureExtractor,
    smoother: EarSmoother,
    perclos: PerclosAccumulator,
    clock: C,
    /// Stream time minus clock time at the last timestamped frame
    clock_offset: f64,
    face_absent_frames: u32,
    frames_updated: u64,
    last_status: Option<StatusSnapshot>,
}

impl DrowsinessMonitor<MonotonicClock> {
    /// Create a monitor timed by the process clock
    pub fn new(config: DmsConfig) -> Result<Self, DmsError> {
        Self::with_clock(config, MonotonicClock::new())
    }
}

impl<C: Clock> DrowsinessMonitor<C> {
    /// Create a monitor with an explicit clock for frames without timestamps
    pub fn with_clock(config: DmsConfig, clock: C) -> Result<Self, DmsError> {
        config.validate()?;
        Ok(Self {
            extractor: EyeFeatureExtractor::from_config(&config),
            smoother: EarSmoother::new(config.smoothing_alpha)?,
            perclos: PerclosAccumulator::from_config(&config)?,
            clock,
            clock_offset: 0.0,
            face_absent_frames: 0,
            frames_updated: 0,
            last_status: None,
            config,
        })
    }

    /// Feed one frame worth of landmarks.
    ///
    /// `landmarks` is `None` when the detector found no face. `timestamp`
    /// falls back to the monitor's clock when absent, shifted onto the
    /// timeline of the last timestamped frame so that streams mixing both
    /// kinds of frame stay in order.
    pub fn process(
        &mut self,
        landmarks: Option<&[LandmarkPoint]>,
        timestamp: Option<f64>,
    ) -> Result<FrameOutcome, DmsError> {
        let Some(points) = landmarks else {
            self.face_absent_frames += 1;
            if self.face_absent_frames == FACE_ABSENT_WARN_FRAMES {
                warn!("Face not visible for {} frames", self.face_absent_frames);
            }
            return Ok(FrameOutcome::NoFace);
        };
        self.face_absent_frames = 0;

        let Some(ear) = self.extractor.extract(points) else {
            let required = self.extractor.required_landmarks();
            warn!("Skipping frame with {} landmarks ({} required)", points.len(), required);
            return Ok(FrameOutcome::InsufficientLandmarks {
                found: points.len(),
                required,
            });
        };

        let explicit = timestamp.is_some();
        let timestamp = timestamp.unwrap_or_else(|| self.clock.now_seconds() + self.clock_offset);
        if let Some(last) = self.perclos.last_timestamp() {
            if timestamp < last {
                warn!("Dropping frame at {:.3}s, older than {:.3}s", timestamp, last);
                return Err(DmsError::NonMonotonicTimestamp { last, got: timestamp });
            }
        }

        if explicit {
            self.clock_offset = timestamp - self.clock.now_seconds();
        }

        let smoothed = self.smoother.update(ear.average);
        let sample = match self.config.perclos_input {
            PerclosInput::Smoothed => smoothed,
            PerclosInput::Raw => ear.average,
        };
        debug!(
            "EAR L={:.3} R={:.3} avg={:.3} smoothed={:.3}",
            ear.left, ear.right, ear.average, smoothed
        );

        self.perclos.add_measurement(sample, timestamp)?;
        self.perclos.calculate();

        let status = self.perclos.get_state();
        self.frames_updated += 1;
        self.last_status = Some(status.clone());
        Ok(FrameOutcome::Updated(status))
    }

    /// Feed a recorded [`LandmarkFrame`]
    pub fn process_frame(&mut self, frame: &LandmarkFrame) -> Result<FrameOutcome, DmsError> {
        self.process(frame.landmarks.as_deref(), frame.timestamp)
    }

    /// Latest status (initial reading before any update)
    pub fn status(&self) -> StatusSnapshot {
        self.last_status
            .clone()
            .unwrap_or_else(|| self.perclos.get_state())
    }

    /// Consecutive frames without a face
    pub fn face_absent_frames(&self) -> u32 {
        self.face_absent_frames
    }

    /// Frames that produced a status update
    pub fn frames_updated(&self) -> u64 {
        self.frames_updated
    }

    /// Whether the camera has lost the face for long enough to alert
    pub fn face_not_visible(&self) -> bool {
        self.face_absent_frames >= FACE_ABSENT_WARN_FRAMES
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    /// Start a new session (driver change)
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.perclos.reset();
        self.clock_offset = 0.0;
        self.face_absent_frames = 0;
        self.frames_updated = 0;
        self.last_status = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::fixtures::face_with_ear;
    use crate::state::DrowsinessState;

    fn raw_config(window: f64) -> DmsConfig {
        DmsConfig {
            perclos_window_seconds: window,
            perclos_input: PerclosInput::Raw,
            ..Default::default()
        }
    }

    #[test]
    fn test_alert_driver_stays_attentive() {
        let mut monitor = DrowsinessMonitor::new(DmsConfig::default()).unwrap();
        let face = face_with_ear(0.6);
        for i in 0..60 {
            let outcome = monitor.process(Some(&face), Some(i as f64 / 30.0)).unwrap();
            assert_eq!(outcome.status().unwrap().state, DrowsinessState::Attentive);
        }
        assert_eq!(monitor.frames_updated(), 60);
    }

    #[test]
    fn test_closed_eyes_escalate_to_microsleep() {
        let mut monitor = DrowsinessMonitor::new(raw_config(10.0)).unwrap();
        let open = face_with_ear(0.6);
        let closed = face_with_ear(0.05);

        for t in 0..5 {
            monitor.process(Some(&open), Some(t as f64)).unwrap();
        }
        for t in 5..10 {
            monitor.process(Some(&closed), Some(t as f64)).unwrap();
        }

        let status = monitor.status();
        assert_eq!(status.perclos, 0.5);
        assert_eq!(status.state, DrowsinessState::Microsleep);
    }

    #[test]
    fn test_no_face_changes_nothing() {
        let mut monitor = DrowsinessMonitor::new(raw_config(10.0)).unwrap();
        let closed = face_with_ear(0.05);
        monitor.process(Some(&closed), Some(0.0)).unwrap();
        monitor.process(Some(&closed), Some(1.0)).unwrap();
        let before = monitor.status();

        for t in 2..40 {
            let outcome = monitor.process(None, Some(t as f64)).unwrap();
            assert_eq!(outcome, FrameOutcome::NoFace);
        }
        assert_eq!(monitor.status(), before);
        assert!(monitor.face_not_visible());

        monitor.process(Some(&closed), Some(41.0)).unwrap();
        assert_eq!(monitor.face_absent_frames(), 0);
    }

    #[test]
    fn test_short_landmark_set_is_skipped() {
        let mut monitor = DrowsinessMonitor::new(DmsConfig::default()).unwrap();
        let short = vec![LandmarkPoint::default(); 200];
        let outcome = monitor.process(Some(&short), Some(0.0)).unwrap();
        assert_eq!(
            outcome,
            FrameOutcome::InsufficientLandmarks {
                found: 200,
                required: 388
            }
        );
        assert_eq!(monitor.status().samples_in_window, 0);
    }

    #[test]
    fn test_missing_timestamp_uses_clock() {
        let clock = ManualClock::with_step(100.0, 0.5);
        let mut monitor = DrowsinessMonitor::with_clock(raw_config(1.0), clock).unwrap();
        let face = face_with_ear(0.6);
        for _ in 0..6 {
            monitor.process(Some(&face), None).unwrap();
        }
        // Readings at 100.0 .. 102.5; a 1 s window keeps 101.5, 102.0, 102.5
        assert_eq!(monitor.status().samples_in_window, 3);
    }

    #[test]
    fn test_untimed_frames_follow_stream_timeline() {
        let clock = ManualClock::new(0.0);
        let mut monitor = DrowsinessMonitor::with_clock(raw_config(10.0), &clock).unwrap();
        let face = face_with_ear(0.6);

        monitor.process(Some(&face), Some(100.0)).unwrap();
        clock.advance(0.5);
        monitor.process(Some(&face), None).unwrap();
        clock.advance(0.5);
        monitor.process(Some(&face), None).unwrap();
        monitor.process(Some(&face), Some(101.5)).unwrap();

        let stamps: Vec<f64> = monitor.perclos.samples().map(|s| s.timestamp).collect();
        assert_eq!(stamps, vec![100.0, 100.5, 101.0, 101.5]);
    }

    #[test]
    fn test_backwards_timestamp_is_rejected_without_mutation() {
        let mut monitor = DrowsinessMonitor::new(DmsConfig::default()).unwrap();
        let face = face_with_ear(0.6);
        monitor.process(Some(&face), Some(5.0)).unwrap();

        let err = monitor.process(Some(&face_with_ear(0.05)), Some(4.0)).unwrap_err();
        assert!(matches!(err, DmsError::NonMonotonicTimestamp { .. }));
        assert_eq!(monitor.status().samples_in_window, 1);

        // Smoother untouched: a repeat of the open face still reads fully open
        monitor.process(Some(&face), Some(6.0)).unwrap();
        assert_eq!(monitor.status().perclos, 0.0);
    }

    #[test]
    fn test_smoothing_delays_single_blink() {
        let config = DmsConfig {
            perclos_window_seconds: 10.0,
            ..Default::default()
        };
        let mut monitor = DrowsinessMonitor::new(config).unwrap();
        let open = face_with_ear(0.35);
        let closed = face_with_ear(0.0);

        for t in 0..5 {
            monitor.process(Some(&open), Some(t as f64)).unwrap();
        }
        // 0.35 + 0.3 * (0 - 0.35) = 0.245, still above 0.21
        monitor.process(Some(&closed), Some(5.0)).unwrap();
        assert_eq!(monitor.status().perclos, 0.0);
    }

    #[test]
    fn test_process_recorded_frame() {
        let mut monitor = DrowsinessMonitor::new(DmsConfig::default()).unwrap();
        let frame = LandmarkFrame {
            timestamp: Some(1.0),
            landmarks: Some(face_with_ear(0.3)),
        };
        assert!(monitor.process_frame(&frame).unwrap().status().is_some());
        assert_eq!(
            monitor.process_frame(&LandmarkFrame::default()).unwrap(),
            FrameOutcome::NoFace
        );
    }

    #[test]
    fn test_reset_starts_new_session() {
        let mut monitor = DrowsinessMonitor::new(raw_config(10.0)).unwrap();
        let closed = face_with_ear(0.05);
        for t in 0..5 {
            monitor.process(Some(&closed), Some(t as f64)).unwrap();
        }
        assert_eq!(monitor.status().state, DrowsinessState::Microsleep);

        monitor.reset();
        assert_eq!(monitor.status().state, DrowsinessState::Attentive);
        assert_eq!(monitor.frames_updated(), 0);

        // Earlier timestamps are accepted again after a reset
        monitor.process(Some(&closed), Some(0.0)).unwrap();
    }
}
