//! Poll loop driver.
//!
//! Periodically picks up pending jobs and in-flight jobs that stopped making
//! progress (a worker crash mid-pipeline) and hands them to the orchestrator,
//! one at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::WorkerResult;
use crate::orchestrator::PipelineOrchestrator;
use crate::retry::FailureTracker;

/// Drives queued and stale jobs through the pipeline.
pub struct JobPoller {
    orchestrator: Arc<PipelineOrchestrator>,
    poll_interval: Duration,
    stale_after: Duration,
    shutdown: watch::Sender<bool>,
}

impl JobPoller {
    pub fn new(
        orchestrator: Arc<PipelineOrchestrator>,
        poll_interval: Duration,
        stale_after: Duration,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            orchestrator,
            poll_interval,
            stale_after,
            shutdown,
        }
    }

    /// Run until [`shutdown`](Self::shutdown) is called. A job being processed
    /// when the signal arrives is finished first.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting poll loop every {:?}, resuming jobs idle for {:?}",
            self.poll_interval, self.stale_after
        );

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = FailureTracker::new(3);

        while !self.is_shutting_down() {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    match self.run_once().await {
                        Ok(processed) => {
                            failures.record_success();
                            if processed > 0 {
                                info!("Processed {} job(s)", processed);
                            }
                        }
                        Err(e) => {
                            if failures.record_failure() {
                                warn!("Poll failed: {}", e);
                            }
                        }
                    }
                }
            }
        }

        info!("Poll loop stopped");
        Ok(())
    }

    /// One scan: process every pending or stale job, oldest first.
    ///
    /// Returns how many jobs reached a terminal status. Stops early once
    /// shutdown is requested.
    pub async fn run_once(&self) -> WorkerResult<usize> {
        let jobs = self
            .orchestrator
            .tracker()
            .pending_or_stale(self.stale_after)
            .await?;

        let mut processed = 0;
        for job in jobs {
            if self.is_shutting_down() {
                debug!("Shutdown requested, leaving remaining jobs for the next run");
                break;
            }
            match self.orchestrator.process(&job.id).await {
                Ok(done) => {
                    debug!(job_id = %done.id, "Job finished as {}", done.status);
                    processed += 1;
                }
                Err(e) if e.is_not_found() => {
                    debug!(job_id = %job.id, "Job deleted before it was processed");
                }
                Err(e) => {
                    warn!(job_id = %job.id, "Job left in {}: {}", job.status, e);
                }
            }
        }

        Ok(processed)
    }

    /// Signal shutdown. Stored even when the loop is not running yet.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}
