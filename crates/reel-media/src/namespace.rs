//! Per-job working directories.

use std::path::{Path, PathBuf};

use reel_models::encoding::{
    AUDIO_STEM, DESCRIPTION_FILE, MANIFEST_FILE, REEL_FILE, REEL_SCRATCH_FILE,
};
use reel_models::JobId;

use crate::error::{MediaError, MediaResult};

/// Audio extensions recognised when locating an existing audio artifact.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "wav", "ogg"];

/// Root of the worker's local storage.
///
/// ```text
/// {root}/uploads/{job_id}/   one namespace per job
/// {root}/background/         shared background-track pool
/// ```
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    pub fn background_dir(&self) -> PathBuf {
        self.root.join("background")
    }

    /// Namespace for a job. Ids that are not a single safe path segment are rejected.
    pub fn namespace(&self, job_id: &JobId) -> MediaResult<JobNamespace> {
        if !job_id.is_path_safe() {
            return Err(MediaError::internal(format!(
                "job id is not usable as a directory name: {:?}",
                job_id.as_str()
            )));
        }
        Ok(JobNamespace {
            job_id: job_id.clone(),
            dir: self.uploads_dir().join(job_id.as_str()),
        })
    }

    /// Create the uploads and background directories.
    pub async fn ensure_dirs(&self) -> MediaResult<()> {
        tokio::fs::create_dir_all(self.uploads_dir()).await?;
        tokio::fs::create_dir_all(self.background_dir()).await?;
        Ok(())
    }
}

/// The directory holding one job's ephemeral files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobNamespace {
    job_id: JobId,
    dir: PathBuf,
}

impl JobNamespace {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn description_path(&self) -> PathBuf {
        self.dir.join(DESCRIPTION_FILE)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    pub fn image_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// `audio.<ext>` inside the namespace.
    pub fn audio_path(&self, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", AUDIO_STEM, ext))
    }

    pub fn reel_path(&self) -> PathBuf {
        self.dir.join(REEL_FILE)
    }

    pub fn scratch_path(&self) -> PathBuf {
        self.dir.join(REEL_SCRATCH_FILE)
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    pub async fn create(&self) -> MediaResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Existing `audio.<ext>` file, if one was written earlier.
    pub fn find_audio(&self) -> Option<PathBuf> {
        AUDIO_EXTENSIONS
            .iter()
            .map(|ext| self.audio_path(ext))
            .find(|p| p.is_file())
    }

    /// Delete the whole namespace directory. Missing directories are fine.
    pub async fn remove(&self) -> MediaResult<()> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediaError::from(e)),
        }
    }
}
