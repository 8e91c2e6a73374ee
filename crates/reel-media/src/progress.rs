//! FFmpeg `-progress` output parsing.

use serde::{Deserialize, Serialize};

/// Progress snapshot reported by FFmpeg.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Progress percentage given the expected output duration in milliseconds.
    pub fn percentage(&self, total_duration_ms: i64) -> f64 {
        if total_duration_ms <= 0 {
            return 0.0;
        }
        ((self.out_time_ms as f64 / total_duration_ms as f64) * 100.0).clamp(0.0, 100.0)
    }
}

/// Outcome of feeding one stderr line to the parser.
#[derive(Debug, PartialEq)]
pub(crate) enum ProgressLine {
    /// A `key=value` progress field was absorbed
    Field,
    /// A `progress=` line closed a snapshot
    Snapshot,
    /// Anything else: encoder diagnostics
    Other,
}

/// Parse a line of FFmpeg's `-progress pipe:2` output into `current`.
pub(crate) fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> ProgressLine {
    let line = line.trim();

    let Some((key, value)) = line.split_once('=') else {
        return ProgressLine::Other;
    };

    match key {
        "out_time_ms" | "out_time_us" => {
            // FFmpeg reports microseconds under both names
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
            ProgressLine::Field
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
            ProgressLine::Field
        }
        "speed" => {
            if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                current.speed = speed;
            }
            ProgressLine::Field
        }
        "progress" => {
            current.is_complete = value == "end";
            ProgressLine::Snapshot
        }
        "fps" | "bitrate" | "total_size" | "out_time" | "dup_frames" | "drop_frames"
        | "stream_0_0_q" => ProgressLine::Field,
        _ => ProgressLine::Other,
    }
}
