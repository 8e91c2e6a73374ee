//! Pipeline orchestration.
//!
//! [`PipelineOrchestrator::process`] drives a job from wherever its persisted
//! status says it is to a terminal status. Both the inline driver and the poll
//! loop call it, so a job resumed after a crash goes through exactly the same
//! transitions as a fresh one.

use std::time::Instant;

use tracing::{debug, Instrument};

use reel_media::{AssemblyError, JobNamespace, ReelAssembler, Workspace};
use reel_models::{
    AudioArtifact, AudioSource, FailureKind, Job, JobFailure, JobId, JobStatus, PublishedRef,
};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::publisher::ArtifactPublisher;
use crate::retry::StagePolicy;
use crate::synthesizer::VoiceSynthesizer;
use crate::tracker::JobStatusTracker;

/// Runs jobs through synthesis, assembly and publishing.
pub struct PipelineOrchestrator {
    tracker: JobStatusTracker,
    synthesizer: VoiceSynthesizer,
    assembler: ReelAssembler,
    publisher: ArtifactPublisher,
    encode_policy: StagePolicy,
    workspace: Workspace,
}

impl PipelineOrchestrator {
    pub fn new(
        tracker: JobStatusTracker,
        synthesizer: VoiceSynthesizer,
        assembler: ReelAssembler,
        publisher: ArtifactPublisher,
        workspace: Workspace,
    ) -> Self {
        Self {
            tracker,
            synthesizer,
            assembler,
            publisher,
            encode_policy: StagePolicy::single_attempt("assembly"),
            workspace,
        }
    }

    pub fn tracker(&self) -> &JobStatusTracker {
        &self.tracker
    }

    /// Process a job to a terminal status and return the final record.
    ///
    /// Terminal jobs are returned unchanged. Job-level failures end in the
    /// `failed` status and are not errors; `Err` means the store or another
    /// piece of infrastructure could not be reached.
    pub async fn process(&self, job_id: &JobId) -> WorkerResult<Job> {
        let job = self.tracker.get(job_id).await?;
        if job.is_terminal() {
            debug!(job_id = %job_id, "Job already {}, nothing to do", job.status);
            return Ok(job);
        }

        let logger = JobLogger::new(job_id, "pipeline");
        let span = logger.create_span();
        self.run(job, &logger).instrument(span).await
    }

    async fn run(&self, mut job: Job, logger: &JobLogger) -> WorkerResult<Job> {
        let started = Instant::now();
        logger.log_start(&format!(
            "{} image(s) at {}s each, status {}",
            job.images.len(),
            job.image_duration_secs,
            job.status
        ));

        let ns = match self.workspace.namespace(&job.id) {
            Ok(ns) => ns,
            Err(e) => {
                return self
                    .fail(&job.id, logger, JobFailure::new(FailureKind::Internal, e.to_string()))
                    .await
            }
        };

        // Validation-first: no synthesis for a job that can never be assembled.
        // Past assembly the images may already have been reclaimed by publish.
        if job.status != JobStatus::Publishing {
            if let Err(e) = self.assembler.validate_images(&job.id, &job.images).await {
                return self.fail(&job.id, logger, e.into()).await;
            }
        }

        let mut audio: Option<AudioArtifact> = None;

        loop {
            job = match job.status {
                JobStatus::Pending => {
                    self.tracker
                        .advance(&job.id, JobStatus::Synthesizing, None)
                        .await?
                }
                JobStatus::Synthesizing => {
                    let artifact = self.synthesize(&job, &ns, logger).await;
                    self.tracker
                        .record_audio_source(&job.id, artifact.source)
                        .await?;
                    audio = Some(artifact);
                    self.tracker
                        .advance(&job.id, JobStatus::Assembling, None)
                        .await?
                }
                JobStatus::Assembling => {
                    let artifact = match audio.take() {
                        Some(a) => a,
                        None => self.resume_audio(&job, &ns, logger).await?,
                    };

                    let stage_start = Instant::now();
                    let assembled = self
                        .encode_policy
                        .run(
                            || {
                                self.assembler.assemble(
                                    &job.id,
                                    &job.images,
                                    &artifact,
                                    job.image_duration_secs,
                                )
                            },
                            |_: &AssemblyError| false,
                        )
                        .await
                        .into_result();
                    self.record_stage(logger, "assembly", stage_start);

                    match assembled {
                        Ok(video) => {
                            if let Some(info) = video.info {
                                self.tracker.record_video_info(&job.id, info).await?;
                            }
                            self.tracker
                                .advance(&job.id, JobStatus::Publishing, None)
                                .await?
                        }
                        Err(e) => return self.fail(&job.id, logger, e.into()).await,
                    }
                }
                JobStatus::Publishing => {
                    let reel = ns.reel_path();
                    let stage_start = Instant::now();
                    let published = self.publisher.publish(&reel, &job.id).await;
                    self.record_stage(logger, "publish", stage_start);

                    if let PublishedRef::Local { path } = &published {
                        if !path.is_file() {
                            let failure = JobFailure::new(
                                FailureKind::Internal,
                                format!("reel {} is missing and was never published", path.display()),
                            );
                            return self.fail(&job.id, logger, failure).await;
                        }
                    }

                    let completed = self
                        .tracker
                        .advance(&job.id, JobStatus::Completed, Some(published.reference()))
                        .await?;
                    metrics::record_job_completed(published.is_remote());
                    metrics::record_stage_duration("total", started.elapsed().as_secs_f64());
                    logger.log_completion(&published.reference());
                    completed
                }
                JobStatus::Completed | JobStatus::Failed => return Ok(job),
            };
        }
    }

    async fn synthesize(&self, job: &Job, ns: &JobNamespace, logger: &JobLogger) -> AudioArtifact {
        let stage_start = Instant::now();
        let audio = self.synthesizer.synthesize(&job.description, ns).await;
        self.record_stage(logger, "synthesis", stage_start);
        audio
    }

    /// Audio for a job resumed in `assembling`: the artifact written before
    /// the interruption if it is still there, otherwise a fresh synthesis.
    async fn resume_audio(
        &self,
        job: &Job,
        ns: &JobNamespace,
        logger: &JobLogger,
    ) -> WorkerResult<AudioArtifact> {
        if let Some(path) = ns.find_audio() {
            let source = job.audio_source.unwrap_or(AudioSource::Synthesized);
            debug!(job_id = %job.id, "Reusing {} from earlier run", path.display());
            return Ok(AudioArtifact::new(path, source));
        }

        logger.log_warning("audio from earlier run is gone, synthesizing again");
        let artifact = self.synthesize(job, ns, logger).await;
        self.tracker
            .record_audio_source(&job.id, artifact.source)
            .await?;
        Ok(artifact)
    }

    async fn fail(
        &self,
        job_id: &JobId,
        logger: &JobLogger,
        failure: JobFailure,
    ) -> WorkerResult<Job> {
        logger.log_failure(&failure);
        metrics::record_job_failed(failure.kind.as_str());
        self.tracker.fail(job_id, failure).await
    }

    fn record_stage(&self, logger: &JobLogger, stage: &str, start: Instant) {
        let elapsed = start.elapsed();
        metrics::record_stage_duration(stage, elapsed.as_secs_f64());
        logger.log_stage(stage, elapsed.as_millis() as u64);
    }

    /// Create a new pending job from `job_id`'s description and images.
    ///
    /// Only terminal jobs whose images are all still in their namespace can be
    /// resubmitted; nothing is persisted otherwise.
    pub async fn resubmit(&self, job_id: &JobId) -> WorkerResult<Job> {
        let original = self.tracker.get(job_id).await?;
        if !original.is_terminal() {
            return Err(WorkerError::validation(format!(
                "job {} is still {}",
                job_id, original.status
            )));
        }

        let logger = JobLogger::new(job_id, "resubmit");
        let source = self.workspace.namespace(job_id)?;

        let missing: Vec<&str> = original
            .images
            .iter()
            .filter(|name| !source.image_path(name).is_file())
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(WorkerError::validation(format!(
                "job {} can no longer be resubmitted, images are gone: {}",
                job_id,
                missing.join(", ")
            )));
        }

        let mut job = Job::new(
            JobId::new(),
            original.owner.clone(),
            original.description.clone(),
            original.images.clone(),
            original.image_duration_secs,
        );
        job.resubmitted_from = Some(original.id.clone());
        let target = self.workspace.namespace(&job.id)?;

        if let Err(e) = self.populate_resubmission(&source, &target, &job).await {
            let _ = target.remove().await;
            return Err(e);
        }

        logger.log_completion(&format!("resubmitted as {}", job.id));
        Ok(job)
    }

    async fn populate_resubmission(
        &self,
        source: &JobNamespace,
        target: &JobNamespace,
        job: &Job,
    ) -> WorkerResult<()> {
        target.create().await?;
        tokio::fs::write(target.description_path(), &job.description).await?;
        for name in &job.images {
            tokio::fs::copy(source.image_path(name), target.image_path(name)).await?;
        }
        self.tracker.create(job).await
    }
}
