//! Reel encoding configuration and namespace file names.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 23;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";
/// Output frame rate
pub const DEFAULT_FPS: u32 = 30;

/// Vertical reel canvas
pub const REEL_WIDTH: u32 = 1080;
pub const REEL_HEIGHT: u32 = 1920;

/// Per-image display duration bounds (seconds)
pub const MIN_IMAGE_DURATION_SECS: u32 = 1;
pub const MAX_IMAGE_DURATION_SECS: u32 = 10;
pub const DEFAULT_IMAGE_DURATION_SECS: u32 = 1;

/// Length of generated tone/silence fallbacks (seconds)
pub const FALLBACK_AUDIO_SECS: f64 = 5.0;
/// Sample rate of generated fallbacks and synthesized narration
pub const FALLBACK_SAMPLE_RATE: u32 = 22_050;

/// Canonical file names inside a job namespace
pub const DESCRIPTION_FILE: &str = "description.txt";
pub const MANIFEST_FILE: &str = "input.txt";
pub const AUDIO_STEM: &str = "audio";
pub const REEL_FILE: &str = "reel.mp4";
pub const REEL_SCRATCH_FILE: &str = "reel.part.mp4";

/// Video encoding configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    /// Video codec
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "fast", "medium", "slow")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Output frame rate
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Output canvas width (forced even)
    #[serde(default = "default_width")]
    pub width: u32,

    /// Output canvas height (forced even)
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}
fn default_fps() -> u32 {
    DEFAULT_FPS
}
fn default_width() -> u32 {
    REEL_WIDTH
}
fn default_height() -> u32 {
    REEL_HEIGHT
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: default_video_codec(),
            preset: default_preset(),
            crf: DEFAULT_CRF,
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            fps: DEFAULT_FPS,
            width: REEL_WIDTH,
            height: REEL_HEIGHT,
        }
    }
}

impl EncodingConfig {
    /// Canvas dimensions rounded down to even values (minimum 2x2).
    pub fn even_dimensions(&self) -> (u32, u32) {
        (to_even(self.width), to_even(self.height))
    }
}

/// Round a pixel dimension down to the nearest even value, never below 2.
///
/// H.264 with 4:2:0 chroma subsampling rejects odd widths and heights.
pub fn to_even(value: u32) -> u32 {
    (value & !1).max(2)
}
