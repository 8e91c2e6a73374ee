//! Reel generation pipeline worker.
//!
//! This crate provides:
//! - Narration synthesis with background/tone/silence fallbacks
//! - Publishing to object storage with local fallback
//! - The job status tracker and pipeline orchestrator
//! - Upload intake, gallery and admin queries
//! - The poll loop with graceful shutdown

pub mod admin;
pub mod config;
pub mod error;
pub mod intake;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod poller;
pub mod publisher;
pub mod retry;
pub mod service;
pub mod synthesizer;
pub mod tracker;

pub use admin::AdminService;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use intake::JobIntake;
pub use logging::JobLogger;
pub use orchestrator::PipelineOrchestrator;
pub use poller::JobPoller;
pub use publisher::ArtifactPublisher;
pub use retry::{FailureTracker, RetryResult, StagePolicy};
pub use service::{Backends, ReelService};
pub use synthesizer::VoiceSynthesizer;
pub use tracker::JobStatusTracker;
