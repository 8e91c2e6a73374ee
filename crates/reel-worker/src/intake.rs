//! Upload intake: turns a submission into a pending job.

use std::collections::HashSet;
use std::path::Path;

use validator::Validate;

use reel_media::{JobNamespace, Workspace};
use reel_models::encoding::{
    AUDIO_STEM, DESCRIPTION_FILE, MANIFEST_FILE, REEL_FILE, REEL_SCRATCH_FILE,
};
use reel_models::{sanitize_file_name, Job, SubmitRequest};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::tracker::JobStatusTracker;

/// Accepts submissions and stages their files in a fresh namespace.
pub struct JobIntake {
    tracker: JobStatusTracker,
    workspace: Workspace,
}

impl JobIntake {
    pub fn new(tracker: JobStatusTracker, workspace: Workspace) -> Self {
        Self { tracker, workspace }
    }

    /// Validate `request`, copy its files into the job namespace and persist
    /// a pending job. Nothing is left on disk when submission fails.
    pub async fn submit(&self, request: SubmitRequest) -> WorkerResult<Job> {
        request
            .validate()
            .map_err(|e| WorkerError::validation(e.to_string()))?;

        let job_id = request.job_id.clone().unwrap_or_default();
        if !job_id.is_path_safe() {
            return Err(WorkerError::validation(format!(
                "job id {:?} may only contain letters, digits, '-' and '_'",
                job_id.as_str()
            )));
        }
        if self.tracker.exists(&job_id).await? {
            return Err(WorkerError::AlreadyExists(job_id.to_string()));
        }

        let ns = self.workspace.namespace(&job_id)?;
        if ns.exists() {
            return Err(WorkerError::AlreadyExists(job_id.to_string()));
        }

        let names = image_names(&request.images)?;
        let logger = JobLogger::new(&job_id, "intake");

        let job = Job::new(
            job_id,
            request.owner.clone(),
            request.description.clone(),
            names,
            request.effective_image_duration(),
        );

        if let Err(e) = self.stage(&ns, &request, &job).await {
            let _ = ns.remove().await;
            logger.log_error(&format!("submission rejected: {}", e));
            return Err(e);
        }

        metrics::record_job_submitted();
        logger.log_completion(&format!(
            "accepted {} image(s) at {}s each",
            job.images.len(),
            job.image_duration_secs
        ));
        Ok(job)
    }

    async fn stage(&self, ns: &JobNamespace, request: &SubmitRequest, job: &Job) -> WorkerResult<()> {
        ns.create().await?;
        tokio::fs::write(ns.description_path(), &job.description).await?;

        for (source, name) in request.images.iter().zip(&job.images) {
            match tokio::fs::copy(source, ns.image_path(name)).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(WorkerError::validation(format!(
                        "uploaded image {} not found",
                        source.display()
                    )))
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.tracker.create(job).await
    }
}

/// Namespace file names for the uploaded images, in order.
///
/// Names are reduced to a plain file name. Repeats and names the pipeline
/// writes itself get an index prefix.
fn image_names(images: &[impl AsRef<Path>]) -> WorkerResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(images.len());

    for (index, path) in images.iter().enumerate() {
        let path = path.as_ref();
        let raw = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let name = sanitize_file_name(raw).ok_or_else(|| {
            WorkerError::validation(format!("unusable image file name: {}", path.display()))
        })?;

        let mut candidate = name.clone();
        let mut suffix = index;
        while seen.contains(&candidate) || is_reserved(&candidate) {
            candidate = format!("{}_{}", suffix, name);
            suffix += 1;
        }
        seen.insert(candidate.clone());
        names.push(candidate);
    }

    Ok(names)
}

/// Names the pipeline writes into the namespace itself.
fn is_reserved(name: &str) -> bool {
    [DESCRIPTION_FILE, MANIFEST_FILE, REEL_FILE, REEL_SCRATCH_FILE].contains(&name)
        || Path::new(name).file_stem().and_then(|s| s.to_str()) == Some(AUDIO_STEM)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_models::JobId;
    use reel_store::MemoryJobRepository;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn intake(dir: &TempDir) -> JobIntake {
        JobIntake::new(
            JobStatusTracker::new(Arc::new(MemoryJobRepository::new())),
            Workspace::new(dir.path().join("work")),
        )
    }

    async fn upload(dir: &TempDir, name: &str) -> PathBuf {
        let uploads = dir.path().join("incoming");
        tokio::fs::create_dir_all(&uploads).await.unwrap();
        let path = uploads.join(name);
        tokio::fs::write(&path, b"image bytes").await.unwrap();
        path
    }

    #[test]
    fn test_image_names_dedupe() {
        let names = image_names(&[
            PathBuf::from("/a/photo.jpg"),
            PathBuf::from("/b/photo.jpg"),
            PathBuf::from("/c/cover.png"),
        ])
        .unwrap();
        assert_eq!(names, vec!["photo.jpg", "1_photo.jpg", "cover.png"]);
    }

    #[test]
    fn test_image_names_avoid_pipeline_files() {
        let names = image_names(&[PathBuf::from("reel.mp4"), PathBuf::from("audio.jpg")]).unwrap();
        assert_eq!(names, vec!["0_reel.mp4", "1_audio.jpg"]);
    }

    #[tokio::test]
    async fn test_submit_stages_files() {
        let dir = TempDir::new().unwrap();
        let intake = intake(&dir);
        let a = upload(&dir, "a.jpg").await;
        let b = upload(&dir, "b.jpg").await;

        let job = intake
            .submit(
                SubmitRequest::new("Hello world", vec![a, b])
                    .with_owner("user-1")
                    .with_image_duration(3),
            )
            .await
            .unwrap();

        assert_eq!(job.images, vec!["a.jpg", "b.jpg"]);
        assert_eq!(job.image_duration_secs, 3);
        let ns = Workspace::new(dir.path().join("work"))
            .namespace(&job.id)
            .unwrap();
        assert_eq!(
            tokio::fs::read_to_string(ns.description_path()).await.unwrap(),
            "Hello world"
        );
        assert!(ns.image_path("b.jpg").is_file());
    }

    #[tokio::test]
    async fn test_submit_clamps_duration() {
        let dir = TempDir::new().unwrap();
        let a = upload(&dir, "a.jpg").await;

        let job = intake(&dir)
            .submit(SubmitRequest::new("x", vec![a]).with_image_duration(60))
            .await
            .unwrap();
        assert_eq!(job.image_duration_secs, 10);
    }

    #[tokio::test]
    async fn test_submit_without_images_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = intake(&dir)
            .submit(SubmitRequest::new("Hello", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let dir = TempDir::new().unwrap();
        let intake = intake(&dir);
        let a = upload(&dir, "a.jpg").await;
        let id = JobId::from("fixed-id");

        intake
            .submit(SubmitRequest::new("one", vec![a.clone()]).with_job_id(id.clone()))
            .await
            .unwrap();
        let err = intake
            .submit(SubmitRequest::new("two", vec![a]).with_job_id(id.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_missing_upload_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let intake = intake(&dir);
        let id = JobId::from("broken");

        let err = intake
            .submit(
                SubmitRequest::new("Hello", vec![dir.path().join("nope.jpg")])
                    .with_job_id(id.clone()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::Validation(_)));
        let ns = Workspace::new(dir.path().join("work")).namespace(&id).unwrap();
        assert!(!ns.exists());
        assert!(!intake.tracker.exists(&id).await.unwrap());
    }
}
