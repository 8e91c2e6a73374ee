//! Wiring of the pipeline components.

use std::sync::Arc;

use reel_media::{AssemblerConfig, CommandRunner, ReelAssembler, Workspace};
use reel_models::{Job, JobId, SubmitRequest};
use reel_storage::{ObjectStore, DEFAULT_KEY_PREFIX};
use reel_store::JobRepository;
use reel_voice::SpeechSynthesis;

use crate::admin::AdminService;
use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::intake::JobIntake;
use crate::orchestrator::PipelineOrchestrator;
use crate::poller::JobPoller;
use crate::publisher::ArtifactPublisher;
use crate::retry::StagePolicy;
use crate::synthesizer::VoiceSynthesizer;
use crate::tracker::JobStatusTracker;

/// External collaborators the pipeline runs against.
pub struct Backends {
    pub repo: Arc<dyn JobRepository>,
    pub voice: Arc<dyn SpeechSynthesis>,
    pub runner: Arc<dyn CommandRunner>,
    /// `None` keeps every reel local
    pub store: Option<Arc<dyn ObjectStore>>,
    pub key_prefix: String,
}

impl Backends {
    pub fn new(
        repo: Arc<dyn JobRepository>,
        voice: Arc<dyn SpeechSynthesis>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            repo,
            voice,
            runner,
            store: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ObjectStore>, key_prefix: impl Into<String>) -> Self {
        self.store = Some(store);
        self.key_prefix = key_prefix.into();
        self
    }
}

/// The reel pipeline: intake, processing, and the gallery/admin side.
pub struct ReelService {
    config: WorkerConfig,
    workspace: Workspace,
    intake: JobIntake,
    orchestrator: Arc<PipelineOrchestrator>,
    admin: AdminService,
}

impl ReelService {
    pub fn new(config: WorkerConfig, backends: Backends) -> Self {
        let workspace = Workspace::new(&config.work_dir);
        let tracker = JobStatusTracker::new(backends.repo);

        let synthesizer = VoiceSynthesizer::new(
            backends.voice,
            Arc::clone(&backends.runner),
            workspace.clone(),
            StagePolicy::new("synthesis")
                .with_max_attempts(config.voice_max_attempts)
                .with_base_delay(config.retry_base_delay),
            config.fallback_audio_secs,
            config.fallback_sample_rate,
        );

        let assembler = ReelAssembler::new(
            backends.runner,
            workspace.clone(),
            AssemblerConfig {
                encoding: config.encoding.clone(),
                probe_output: config.probe_output,
            },
        );

        let publisher = ArtifactPublisher::new(
            backends.store.clone(),
            backends.key_prefix.clone(),
            StagePolicy::new("publish")
                .with_max_attempts(config.publish_max_attempts)
                .with_base_delay(config.retry_base_delay),
            workspace.clone(),
        );

        let orchestrator = Arc::new(PipelineOrchestrator::new(
            tracker.clone(),
            synthesizer,
            assembler,
            publisher,
            workspace.clone(),
        ));

        Self {
            intake: JobIntake::new(tracker.clone(), workspace.clone()),
            admin: AdminService::new(tracker, workspace.clone(), backends.store, backends.key_prefix),
            orchestrator,
            workspace,
            config,
        }
    }

    /// Create the working directories.
    pub async fn init(&self) -> WorkerResult<()> {
        self.workspace.ensure_dirs().await?;
        Ok(())
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn tracker(&self) -> &JobStatusTracker {
        self.orchestrator.tracker()
    }

    pub fn admin(&self) -> &AdminService {
        &self.admin
    }

    /// Accept a submission as a pending job without processing it.
    pub async fn submit(&self, request: SubmitRequest) -> WorkerResult<Job> {
        self.intake.submit(request).await
    }

    /// Inline driver: accept a submission and process it right away.
    pub async fn submit_and_process(&self, request: SubmitRequest) -> WorkerResult<Job> {
        let job = self.intake.submit(request).await?;
        self.orchestrator.process(&job.id).await
    }

    pub async fn process(&self, job_id: &JobId) -> WorkerResult<Job> {
        self.orchestrator.process(job_id).await
    }

    pub async fn resubmit(&self, job_id: &JobId) -> WorkerResult<Job> {
        self.orchestrator.resubmit(job_id).await
    }

    /// Poll loop driver sharing this service's orchestrator.
    pub fn poller(&self) -> JobPoller {
        JobPoller::new(
            Arc::clone(&self.orchestrator),
            self.config.poll_interval,
            self.config.effective_stale_after(),
        )
    }
}
