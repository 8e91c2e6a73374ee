//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use reel_models::{FailureKind, JobFailure};

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Invalid image {path}: {reason}")]
    InvalidImage { path: PathBuf, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Error message plus any captured process output, for operator display.
    pub fn diagnostic(&self) -> String {
        match self {
            MediaError::FfmpegFailed {
                message,
                stderr,
                exit_code,
            } => {
                let mut text = message.clone();
                if let Some(code) = exit_code {
                    text.push_str(&format!(" (exit code {})", code));
                }
                if let Some(stderr) = stderr.as_deref().filter(|s| !s.trim().is_empty()) {
                    text.push('\n');
                    text.push_str(stderr.trim_end());
                }
                text
            }
            MediaError::FfprobeFailed {
                message,
                stderr: Some(stderr),
            } => format!("{}\n{}", message, stderr.trim_end()),
            other => other.to_string(),
        }
    }
}

/// Job-fatal failure raised by the reel assembler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct AssemblyError {
    pub kind: FailureKind,
    pub detail: String,
}

impl AssemblyError {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn no_images() -> Self {
        Self::new(FailureKind::NoImages, "job has no images")
    }

    pub fn missing_asset(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::MissingAsset, detail)
    }

    pub fn invalid_asset(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidAsset, detail)
    }

    pub fn empty_audio(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::EmptyAudio, detail)
    }

    pub fn encode_failed(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::EncodeFailed, detail)
    }
}

impl From<AssemblyError> for JobFailure {
    fn from(err: AssemblyError) -> Self {
        JobFailure::new(err.kind, err.detail)
    }
}
