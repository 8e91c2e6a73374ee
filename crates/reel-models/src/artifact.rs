//! Ephemeral media artifacts and published references.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Origin of a job's audio track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AudioSource {
    /// Narration produced by the voice API
    Synthesized,
    /// Pre-supplied track from the shared background pool
    BackgroundTrack,
    /// Generated low-volume tone
    AmbientTone,
    /// Generated silence
    Silence,
}

impl AudioSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioSource::Synthesized => "synthesized",
            AudioSource::BackgroundTrack => "background_track",
            AudioSource::AmbientTone => "ambient_tone",
            AudioSource::Silence => "silence",
        }
    }

    pub fn is_fallback(&self) -> bool {
        !matches!(self, AudioSource::Synthesized)
    }
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audio file written into a job namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub source: AudioSource,
    /// Why the file may be unusable, when producing it went wrong
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AudioArtifact {
    pub fn new(path: impl Into<PathBuf>, source: AudioSource) -> Self {
        Self {
            path: path.into(),
            source,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn is_fallback(&self) -> bool {
        self.source.is_fallback()
    }
}

/// Finished reel on local disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Probed properties, when ffprobe was available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<VideoInfo>,
}

/// Properties of a finished reel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoInfo {
    pub duration_secs: f64,
    pub size_bytes: u64,
    /// Container format name (e.g. "mp4")
    pub format: String,
}

/// Where a finished reel can be retrieved from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PublishedRef {
    /// Durable object-storage copy
    Remote { url: String, key: String },
    /// Local copy kept because the upload failed
    Local { path: PathBuf },
}

impl PublishedRef {
    pub fn is_remote(&self) -> bool {
        matches!(self, PublishedRef::Remote { .. })
    }

    /// String stored as the job's artifact reference.
    pub fn reference(&self) -> String {
        match self {
            PublishedRef::Remote { url, .. } => url.clone(),
            PublishedRef::Local { path } => path.display().to_string(),
        }
    }
}
