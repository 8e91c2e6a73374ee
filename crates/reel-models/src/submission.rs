//! Job submission requests.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

use crate::encoding::{
    DEFAULT_IMAGE_DURATION_SECS, MAX_IMAGE_DURATION_SECS, MIN_IMAGE_DURATION_SECS,
};
use crate::job::JobId;

/// Request handed over by the upload intake to create a job.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitRequest {
    /// Caller-assigned id; a fresh one is generated when absent
    #[serde(default)]
    pub job_id: Option<JobId>,

    /// Submitting account
    #[serde(default)]
    pub owner: Option<String>,

    /// Narration source text
    pub description: String,

    /// Ordered uploaded image files to copy into the job namespace
    #[validate(length(min = 1, max = 100, message = "Between 1 and 100 images are required"))]
    pub images: Vec<PathBuf>,

    /// Requested per-image duration; clamped into the supported range
    #[serde(default)]
    pub image_duration_secs: Option<i64>,
}

impl SubmitRequest {
    pub fn new(description: impl Into<String>, images: Vec<PathBuf>) -> Self {
        Self {
            job_id: None,
            owner: None,
            description: description.into(),
            images,
            image_duration_secs: None,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_job_id(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    pub fn with_image_duration(mut self, secs: i64) -> Self {
        self.image_duration_secs = Some(secs);
        self
    }

    /// Effective per-image duration after clamping.
    pub fn effective_image_duration(&self) -> u32 {
        self.image_duration_secs
            .map(clamp_image_duration)
            .unwrap_or(DEFAULT_IMAGE_DURATION_SECS)
    }
}

/// Clamp a requested per-image duration into the supported range.
pub fn clamp_image_duration(secs: i64) -> u32 {
    secs.clamp(
        MIN_IMAGE_DURATION_SECS as i64,
        MAX_IMAGE_DURATION_SECS as i64,
    ) as u32
}

/// Reduce an uploaded file name to a safe single path component.
///
/// Keeps ASCII alphanumerics, `.`, `-` and `_`; other characters become `_`.
/// Returns `None` when nothing usable remains.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_' || c == '.') {
        None
    } else {
        Some(cleaned)
    }
}
