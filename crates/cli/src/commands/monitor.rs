//! Monitor command - replay a recorded landmark stream

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use dms::{Clock, DmsError, DrowsinessMonitor, FrameOutcome, MonotonicClock, StatusSnapshot};
use landmarks::FrameReader;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{parse_seconds, parse_unit_interval};
use crate::settings::Settings;

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// JSON-lines landmark stream (`-` for stdin)
    #[arg(short, long, value_name = "JSONL")]
    pub input: PathBuf,

    /// PERCLOS window length
    #[arg(long, value_parser = parse_seconds)]
    pub window_seconds: Option<f64>,

    /// EAR below which a PERCLOS sample counts as closed
    #[arg(long, value_parser = parse_unit_interval)]
    pub ear_threshold: Option<f64>,

    /// Write status snapshots here instead of stdout
    #[arg(short, long, value_name = "JSONL")]
    pub output: Option<PathBuf>,
}

/// One output line per updated frame
#[derive(Debug, Serialize)]
struct StatusLine<'a> {
    line: usize,
    timestamp: Option<f64>,
    #[serde(flatten)]
    status: &'a StatusSnapshot,
}

/// Replay totals
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReplaySummary {
    pub frames: usize,
    pub updated: usize,
    pub no_face: usize,
    pub skipped: usize,
    pub final_status: Option<StatusSnapshot>,
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

pub fn run(args: &MonitorArgs, settings: Settings) -> Result<()> {
    let mut config = settings.dms;
    if let Some(window) = args.window_seconds {
        config.perclos_window_seconds = window;
    }
    if let Some(threshold) = args.ear_threshold {
        config.perclos_ear_threshold = threshold;
    }

    let monitor = DrowsinessMonitor::new(config).context("Invalid monitor configuration")?;
    let input = open_input(&args.input)?;
    let mut output = open_output(args.output.as_deref())?;

    let clock = MonotonicClock::new();
    let started = clock.now_seconds();
    let summary = replay(monitor, input, &mut output)?;
    output.flush()?;
    let elapsed = clock.now_seconds() - started;

    if elapsed > 0.0 {
        info!(
            "Replayed {} frames in {:.2}s (~{:.1} FPS)",
            summary.frames,
            elapsed,
            summary.frames as f64 / elapsed
        );
    }
    info!(
        "{} updated, {} without face, {} skipped",
        summary.updated, summary.no_face, summary.skipped
    );
    if let Some(status) = &summary.final_status {
        info!(
            "Final state: {} (PERCLOS {:.1}%)",
            status.state, status.perclos_percentage
        );
    }

    Ok(())
}

/// Feed every frame of `input` to `monitor`, writing one JSON line per update
pub fn replay<C: Clock, R: BufRead, W: Write>(
    mut monitor: DrowsinessMonitor<C>,
    input: R,
    output: &mut W,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();
    let mut frames = FrameReader::new(input);

    while let Some(frame) = frames.next() {
        let frame = frame.context("Invalid landmark stream")?;
        let line = frames.line();
        summary.frames += 1;

        match monitor.process_frame(&frame) {
            Ok(FrameOutcome::Updated(status)) => {
                summary.updated += 1;
                let record = StatusLine {
                    line,
                    timestamp: frame.timestamp,
                    status: &status,
                };
                serde_json::to_writer(&mut *output, &record)?;
                writeln!(output)?;
                summary.final_status = Some(status);
            }
            Ok(FrameOutcome::NoFace) => summary.no_face += 1,
            Ok(FrameOutcome::InsufficientLandmarks { .. }) => summary.skipped += 1,
            Err(DmsError::NonMonotonicTimestamp { last, got }) => {
                warn!("Line {}: timestamp {:.3}s precedes {:.3}s, skipped", line, got, last);
                summary.skipped += 1;
            }
            Err(e) => return Err(e).with_context(|| format!("Line {line}")),
        }
        debug!("Line {} processed", line);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dms::fixtures::face_with_ear;
    use dms::{DmsConfig, DrowsinessState, ManualClock};

    fn face_json(ear: f64) -> String {
        serde_json::to_string(&face_with_ear(ear)).unwrap()
    }

    fn monitor() -> DrowsinessMonitor<ManualClock> {
        DrowsinessMonitor::with_clock(DmsConfig::default(), ManualClock::new(0.0)).unwrap()
    }

    fn run_stream(stream: &str) -> (ReplaySummary, Vec<serde_json::Value>) {
        let mut out = Vec::new();
        let summary = replay(monitor(), stream.as_bytes(), &mut out).unwrap();
        let lines = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (summary, lines)
    }

    #[test]
    fn test_closed_stream_reaches_microsleep() {
        let stream: String = (0..20)
            .map(|i| format!("{{\"timestamp\": {}, \"landmarks\": {}}}\n", i as f64 * 0.1, face_json(0.05)))
            .collect();
        let (summary, lines) = run_stream(&stream);

        assert_eq!(summary.frames, 20);
        assert_eq!(summary.updated, 20);
        assert_eq!(lines.len(), 20);
        assert_eq!(lines[0]["line"], 1);
        assert_eq!(lines[19]["state"], "Microsleep");
        assert_eq!(
            summary.final_status.unwrap().state,
            DrowsinessState::Microsleep
        );
    }

    #[test]
    fn test_counts_no_face_and_backwards_frames() {
        let open = face_json(0.6);
        let stream = format!(
            "{{\"timestamp\": 1.0, \"landmarks\": {open}}}\n\n\
             {{\"timestamp\": 1.1, \"landmarks\": null}}\n\
             {{\"timestamp\": 0.5, \"landmarks\": {open}}}\n\
             {{\"timestamp\": 1.2, \"landmarks\": [[0.1, 0.2]]}}\n\
             {{\"timestamp\": 1.3, \"landmarks\": {open}}}\n"
        );
        let (summary, lines) = run_stream(&stream);

        assert_eq!(summary.frames, 5);
        assert_eq!(summary.updated, 2);
        assert_eq!(summary.no_face, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(lines[1]["line"], 6);
        assert_eq!(lines[1]["state"], "Attentive");
    }

    #[test]
    fn test_malformed_line_is_fatal() {
        let mut out = Vec::new();
        let result = replay(monitor(), "{\"timestamp\": 1.0}\nnot json\n".as_bytes(), &mut out);
        assert!(result.is_err());
    }
}
