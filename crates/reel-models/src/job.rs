//! Job record for reel generation.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::artifact::{AudioSource, VideoInfo};
use crate::job_status::{JobStatus, TransitionError};

/// Unique identifier for a job. Also names the job's storage namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is safe to use as a single path segment / key component.
    pub fn is_path_safe(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= 128
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Category of a job-fatal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The job has no images to assemble
    NoImages,
    /// A referenced file does not exist
    MissingAsset,
    /// A referenced file is not a decodable image
    InvalidAsset,
    /// The audio artifact is missing or zero bytes
    EmptyAudio,
    /// The encoder exited non-zero, timed out, or produced no output
    EncodeFailed,
    /// Unexpected I/O or store error while running the pipeline
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::NoImages => "no_images",
            FailureKind::MissingAsset => "missing_asset",
            FailureKind::InvalidAsset => "invalid_asset",
            FailureKind::EmptyAudio => "empty_audio",
            FailureKind::EncodeFailed => "encode_failed",
            FailureKind::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure detail recorded on a failed job for operator inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct JobFailure {
    pub kind: FailureKind,
    /// Human-readable detail, including captured encoder diagnostics
    pub detail: String,
}

impl JobFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

/// A persisted reel job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID (namespace key)
    pub id: JobId,

    /// Submitting account, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Narration source text
    pub description: String,

    /// Ordered image file names inside the job namespace
    #[serde(default)]
    pub images: Vec<String>,

    /// Display duration of each image in seconds
    pub image_duration_secs: u32,

    /// Current lifecycle status
    #[serde(default)]
    pub status: JobStatus,

    /// Remote URL or local path of the finished reel (completed jobs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<String>,

    /// Failure detail (failed jobs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<JobFailure>,

    /// Where the narration audio came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_source: Option<AudioSource>,

    /// Probed properties of the finished reel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoInfo>,

    /// Job this one was resubmitted from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resubmitted_from: Option<JobId>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new pending job.
    pub fn new(
        id: JobId,
        owner: Option<String>,
        description: impl Into<String>,
        images: Vec<String>,
        image_duration_secs: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner,
            description: description.into(),
            images,
            image_duration_secs,
            status: JobStatus::Pending,
            artifact_ref: None,
            failure: None,
            audio_source: None,
            video: None,
            resubmitted_from: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Expected reel length in seconds.
    pub fn expected_duration_secs(&self) -> u32 {
        self.image_duration_secs
            .saturating_mul(self.images.len() as u32)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `to`, enforcing the legal edges and the
    /// "artifact reference iff completed" rule.
    pub fn advance(
        &mut self,
        to: JobStatus,
        artifact_ref: Option<String>,
    ) -> Result<(), TransitionError> {
        let to = self.status.transition(to)?;

        match (to, &artifact_ref) {
            (JobStatus::Completed, None) => return Err(TransitionError::MissingArtifactRef),
            (JobStatus::Completed, Some(r)) if r.trim().is_empty() => {
                return Err(TransitionError::MissingArtifactRef)
            }
            (status, Some(_)) if status != JobStatus::Completed => {
                return Err(TransitionError::UnexpectedArtifactRef(status))
            }
            _ => {}
        }

        self.status = to;
        self.artifact_ref = artifact_ref;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Move to `failed` with the given failure detail.
    pub fn fail(&mut self, failure: JobFailure) -> Result<(), TransitionError> {
        self.status.transition(JobStatus::Failed)?;
        self.status = JobStatus::Failed;
        self.artifact_ref = None;
        self.failure = Some(failure);
        self.updated_at = Utc::now();
        Ok(())
    }
}
