//! Fakes shared by the pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use reel_media::{CommandRunner, FfmpegCommand, MediaError, MediaResult};
use reel_models::encoding::REEL_SCRATCH_FILE;
use reel_models::{JobStatus, SubmitRequest};
use reel_storage::{ObjectStore, StorageError, StorageResult};
use reel_store::{JobRepository, MemoryJobRepository, StoreResult};
use reel_voice::{SpeechSynthesis, VoiceError, VoiceResult};
use reel_worker::{Backends, ReelService, WorkerConfig};

/// Voice API double.
#[derive(Default)]
pub struct FakeVoice {
    pub calls: AtomicU32,
    pub texts: Mutex<Vec<String>>,
    pub unavailable: AtomicBool,
}

impl FakeVoice {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesis for FakeVoice {
    async fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(text.to_string());
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(VoiceError::ServiceUnavailable("503 from upstream".to_string()));
        }
        Ok(b"ID3 fake narration".to_vec())
    }
}

/// Encoder double: writes a placeholder file to the command's output.
#[derive(Default)]
pub struct FakeRunner {
    pub commands: Mutex<Vec<Vec<String>>>,
    pub fail_encode: AtomicBool,
    pub fail_tone: AtomicBool,
}

impl FakeRunner {
    /// Argument vectors of reel encodes, oldest first.
    pub fn encodes(&self) -> Vec<Vec<String>> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|args| args.last().is_some_and(|o| o.ends_with(REEL_SCRATCH_FILE)))
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.commands.lock().unwrap().len()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.commands.lock().unwrap().push(cmd.build_args());

        let is_encode = cmd.output().ends_with(REEL_SCRATCH_FILE);
        if is_encode && self.fail_encode.load(Ordering::SeqCst) {
            tokio::fs::write(cmd.output(), b"partial").await?;
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with error",
                Some("Error while opening encoder for output stream #0:0".to_string()),
                Some(1),
            ));
        }
        if !is_encode && self.fail_tone.load(Ordering::SeqCst) {
            return Err(MediaError::ffmpeg_failed("lavfi unavailable", None, Some(1)));
        }

        let body: &[u8] = if is_encode { b"fake mp4 bytes" } else { b"ID3 tone" };
        tokio::fs::write(cmd.output(), body).await?;
        Ok(())
    }
}

/// Object storage double.
#[derive(Default)]
pub struct FakeStore {
    pub uploads: AtomicU32,
    pub objects: Mutex<HashSet<String>>,
    pub unavailable: AtomicBool,
}

impl FakeStore {
    pub fn uploads(&self) -> u32 {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn has(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains(key)
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn upload_file(&self, path: &Path, key: &str, _content_type: &str) -> StorageResult<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::upload_failed("503 Service Unavailable"));
        }
        if !path.is_file() {
            return Err(StorageError::not_found(path.display().to_string()));
        }
        self.objects.lock().unwrap().insert(key.to_string());
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.has(key))
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://cdn.test/{}", key)
    }
}

/// Repository wrapper recording every persisted status.
pub struct RecordingRepository {
    inner: MemoryJobRepository,
    pub statuses: Mutex<Vec<JobStatus>>,
}

impl RecordingRepository {
    pub fn new() -> Self {
        Self {
            inner: MemoryJobRepository::new(),
            statuses: Mutex::new(Vec::new()),
        }
    }

    /// Persisted statuses with consecutive repeats collapsed.
    pub fn transitions(&self) -> Vec<JobStatus> {
        let mut seen = self.statuses.lock().unwrap().clone();
        seen.dedup();
        seen
    }
}

#[async_trait]
impl JobRepository for RecordingRepository {
    async fn insert(&self, job: &reel_models::Job) -> StoreResult<()> {
        self.inner.insert(job).await?;
        self.statuses.lock().unwrap().push(job.status);
        Ok(())
    }

    async fn get(&self, id: &reel_models::JobId) -> StoreResult<Option<reel_models::Job>> {
        self.inner.get(id).await
    }

    async fn upsert(&self, job: &reel_models::Job) -> StoreResult<()> {
        self.inner.upsert(job).await?;
        self.statuses.lock().unwrap().push(job.status);
        Ok(())
    }

    async fn delete(&self, id: &reel_models::JobId) -> StoreResult<bool> {
        self.inner.delete(id).await
    }

    async fn list_by_status(&self, status: JobStatus) -> StoreResult<Vec<reel_models::Job>> {
        self.inner.list_by_status(status).await
    }
}

/// A service wired to fakes in a temporary work directory.
pub struct Harness {
    pub dir: TempDir,
    pub voice: Arc<FakeVoice>,
    pub runner: Arc<FakeRunner>,
    pub store: Arc<FakeStore>,
    pub repo: Arc<RecordingRepository>,
    pub service: ReelService,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut WorkerConfig)) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = WorkerConfig {
            work_dir: dir.path().join("work"),
            retry_base_delay: Duration::from_millis(1),
            probe_output: false,
            fallback_audio_secs: 0.5,
            fallback_sample_rate: 8_000,
            ..WorkerConfig::default()
        };
        adjust(&mut config);

        let voice = Arc::new(FakeVoice::default());
        let runner = Arc::new(FakeRunner::default());
        let store = Arc::new(FakeStore::default());
        let repo = Arc::new(RecordingRepository::new());

        let backends = Backends::new(repo.clone(), voice.clone(), runner.clone())
            .with_store(store.clone(), "bot_ai_vids");
        let service = ReelService::new(config, backends);
        service.init().await.expect("Failed to create work dirs");

        Self {
            dir,
            voice,
            runner,
            store,
            repo,
            service,
        }
    }

    /// Write small PNG uploads and return their paths.
    pub fn uploads(&self, names: &[&str]) -> Vec<PathBuf> {
        let incoming = self.dir.path().join("incoming");
        std::fs::create_dir_all(&incoming).expect("Failed to create upload dir");
        names
            .iter()
            .map(|name| {
                let path = incoming.join(name);
                image::RgbImage::from_pixel(8, 16, image::Rgb([200, 40, 40]))
                    .save_with_format(&path, image::ImageFormat::Png)
                    .expect("Failed to write test image");
                path
            })
            .collect()
    }

    pub fn request(&self, description: &str, names: &[&str], duration: i64) -> SubmitRequest {
        SubmitRequest::new(description, self.uploads(names)).with_image_duration(duration)
    }
}
