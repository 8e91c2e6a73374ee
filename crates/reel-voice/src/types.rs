//! Voice API request types.

use serde::{Deserialize, Serialize};

/// Default narrator voice
pub const DEFAULT_VOICE_ID: &str = "pNInz6obpgDQGcFmaJgB";
/// Default synthesis model
pub const DEFAULT_MODEL_ID: &str = "eleven_turbo_v2_5";
/// MP3, 22.05 kHz, 32 kbps
pub const DEFAULT_OUTPUT_FORMAT: &str = "mp3_22050_32";

/// Voice rendering parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
    pub speed: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.0,
            similarity_boost: 1.0,
            style: 0.0,
            use_speaker_boost: true,
            speed: 1.0,
        }
    }
}

/// Body of a text-to-speech request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    pub model_id: String,
    pub voice_settings: VoiceSettings,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model_id: model_id.into(),
            voice_settings: VoiceSettings::default(),
        }
    }
}

/// File extension for an ElevenLabs `output_format` value such as `mp3_22050_32`.
pub fn extension_for_format(output_format: &str) -> &'static str {
    match output_format.split('_').next().unwrap_or_default() {
        "pcm" => "pcm",
        "ulaw" => "ulaw",
        "opus" => "opus",
        _ => "mp3",
    }
}
