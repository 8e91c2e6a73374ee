//! Shared data models for the reel generation pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs and their lifecycle status
//! - Ephemeral media artifacts (audio, video) and published references
//! - Submission requests and their validation
//! - Encoding and namespace constants

pub mod artifact;
pub mod encoding;
pub mod job;
pub mod job_status;
pub mod submission;

// Re-export common types
pub use artifact::{AudioArtifact, AudioSource, PublishedRef, VideoArtifact, VideoInfo};
pub use encoding::EncodingConfig;
pub use job::{FailureKind, Job, JobFailure, JobId};
pub use job_status::{JobStatus, TransitionError};
pub use submission::{clamp_image_duration, sanitize_file_name, SubmitRequest};
