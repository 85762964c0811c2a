//! Recorded landmark streams
//!
//! One JSON object per line, in capture order:
//!
//! ```text
//! {"timestamp": 12.033, "landmarks": [[0.41, 0.37], ...]}
//! {"timestamp": 12.066, "landmarks": null}
//! ```
//!
//! `timestamp` is in monotonic seconds and may be omitted, in which case the
//! consumer supplies its own clock reading.

use crate::{LandmarkError, LandmarkPoint};
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// One captured frame worth of landmarks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Capture timestamp (seconds)
    #[serde(default)]
    pub timestamp: Option<f64>,

    /// Landmarks, or `None` when no face was found
    #[serde(default)]
    pub landmarks: Option<Vec<LandmarkPoint>>,
}

impl LandmarkFrame {
    pub fn face_detected(&self) -> bool {
        self.landmarks.is_some()
    }
}

/// Iterator over the frames of a JSON-lines landmark stream
pub struct FrameReader<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }

    /// Line number of the last frame returned
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for FrameReader<R> {
    type Item = Result<LandmarkFrame, LandmarkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line += 1;

            let trimmed = self.buf.trim();
            if trimmed.is_empty() {
                continue;
            }

            let line = self.line;
            return Some(serde_json::from_str(trimmed).map_err(|e| {
                LandmarkError::MalformedStream {
                    line,
                    reason: e.to_string(),
                }
            }));
        }
    }
}
