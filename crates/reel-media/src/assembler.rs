//! Reel assembly: images plus audio into a vertical H.264/AAC video.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use reel_models::{
    clamp_image_duration, sanitize_file_name, AudioArtifact, EncodingConfig, JobId, VideoArtifact,
    VideoInfo,
};

use crate::command::{CommandRunner, FfmpegCommand};
use crate::error::{AssemblyError, MediaError};
use crate::fs_utils::{file_size, move_file, remove_if_exists};
use crate::image_check::sniff_image;
use crate::manifest::write_manifest;
use crate::namespace::{JobNamespace, Workspace};
use crate::probe::probe_video;

/// Assembler configuration.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Codec, quality and canvas settings
    pub encoding: EncodingConfig,
    /// Probe the finished reel with ffprobe
    pub probe_output: bool,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            encoding: EncodingConfig::default(),
            probe_output: true,
        }
    }
}

/// Builds reels from a job namespace.
pub struct ReelAssembler {
    runner: Arc<dyn CommandRunner>,
    workspace: Workspace,
    config: AssemblerConfig,
}

impl ReelAssembler {
    pub fn new(runner: Arc<dyn CommandRunner>, workspace: Workspace, config: AssemblerConfig) -> Self {
        Self {
            runner,
            workspace,
            config,
        }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    fn namespace(&self, job_id: &JobId) -> Result<JobNamespace, AssemblyError> {
        self.workspace
            .namespace(job_id)
            .map_err(|e| AssemblyError::invalid_asset(e.to_string()))
    }

    /// Check that every image exists and is a decodable raster image.
    ///
    /// Missing files are reported together before any content is sniffed.
    pub async fn validate_images(
        &self,
        job_id: &JobId,
        images: &[String],
    ) -> Result<(), AssemblyError> {
        if images.is_empty() {
            return Err(AssemblyError::no_images());
        }

        let ns = self.namespace(job_id)?;

        let mut missing = Vec::new();
        for name in images {
            if sanitize_file_name(name).as_deref() != Some(name.as_str()) {
                return Err(AssemblyError::invalid_asset(format!(
                    "image name is not a plain file name: {:?}",
                    name
                )));
            }
            if !ns.image_path(name).is_file() {
                missing.push(name.as_str());
            }
        }
        if !missing.is_empty() {
            return Err(AssemblyError::missing_asset(format!(
                "missing images: {}",
                missing.join(", ")
            )));
        }

        for name in images {
            match sniff_image(ns.image_path(name)).await {
                Ok(meta) => debug!(
                    "Image {} is {:?} {}x{}",
                    name, meta.format, meta.width, meta.height
                ),
                Err(MediaError::FileNotFound(_)) => {
                    return Err(AssemblyError::missing_asset(format!("missing images: {}", name)))
                }
                Err(e) => {
                    return Err(AssemblyError::invalid_asset(format!(
                        "{} is not a decodable image: {}",
                        name, e
                    )))
                }
            }
        }

        Ok(())
    }

    /// Build the encoder invocation for a namespace.
    pub fn encode_command(
        &self,
        ns: &JobNamespace,
        audio: &AudioArtifact,
        total_secs: u32,
    ) -> FfmpegCommand {
        let enc = &self.config.encoding;
        let (width, height) = enc.even_dimensions();

        let filter = format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,\
             setsar=1,fps={fps},format=yuv420p",
            w = width,
            h = height,
            fps = enc.fps
        );

        FfmpegCommand::new(ns.manifest_path(), ns.scratch_path())
            .input_args(["-f", "concat", "-safe", "0"])
            .add_input(&audio.path)
            .input_args(["-stream_loop", "-1"])
            .map("0:v:0")
            .map("1:a:0")
            .video_filter(filter)
            .video_codec(enc.codec.clone())
            .preset(enc.preset.clone())
            .crf(enc.crf)
            .audio_codec(enc.audio_codec.clone())
            .audio_bitrate(enc.audio_bitrate.clone())
            .duration(f64::from(total_secs))
            .output_args(["-movflags", "+faststart"])
    }

    /// Assemble the reel for a job.
    ///
    /// On success `reel.mp4` exists in the namespace and no scratch output is
    /// left behind. On failure no reel file exists.
    pub async fn assemble(
        &self,
        job_id: &JobId,
        images: &[String],
        audio: &AudioArtifact,
        per_image_duration: u32,
    ) -> Result<VideoArtifact, AssemblyError> {
        self.validate_images(job_id, images).await?;

        if !file_size(&audio.path).await.is_some_and(|len| len > 0) {
            let mut detail = format!("audio {} is missing or empty", audio.path.display());
            if let Some(note) = &audio.note {
                detail.push_str(&format!(" ({})", note));
            }
            return Err(AssemblyError::empty_audio(detail));
        }

        let ns = self.namespace(job_id)?;
        let per_image = clamp_image_duration(i64::from(per_image_duration));
        let total_secs = per_image.saturating_mul(images.len() as u32);

        write_manifest(ns.manifest_path(), images, per_image)
            .await
            .map_err(|e| AssemblyError::encode_failed(format!("writing manifest: {}", e)))?;

        let scratch = ns.scratch_path();
        let reel = ns.reel_path();
        let _ = remove_if_exists(&scratch).await;
        let _ = remove_if_exists(&reel).await;

        let cmd = self.encode_command(&ns, audio, total_secs);
        info!(
            job_id = %job_id,
            images = images.len(),
            total_secs,
            audio_source = %audio.source,
            "Encoding reel"
        );

        let start = Instant::now();
        if let Err(e) = self.runner.run(&cmd).await {
            let _ = remove_if_exists(&scratch).await;
            return Err(AssemblyError::encode_failed(e.diagnostic()));
        }

        let size_bytes = match file_size(&scratch).await {
            Some(len) if len > 0 => len,
            _ => {
                let _ = remove_if_exists(&scratch).await;
                return Err(AssemblyError::encode_failed(
                    "encoder exited successfully but produced no output",
                ));
            }
        };

        if let Err(e) = move_file(&scratch, &reel).await {
            let _ = remove_if_exists(&scratch).await;
            return Err(AssemblyError::encode_failed(format!(
                "moving encoded reel into place: {}",
                e
            )));
        }

        info!(
            job_id = %job_id,
            size_bytes,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Reel encoded"
        );

        let info = if self.config.probe_output {
            match probe_video(&reel).await {
                Ok(probe) => Some(VideoInfo::from(probe)),
                Err(e) => {
                    warn!(job_id = %job_id, "Could not probe finished reel: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(VideoArtifact {
            path: reel,
            size_bytes,
            info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::{ImageBuffer, ImageFormat, Rgb};
    use reel_models::{AudioSource, FailureKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    use crate::error::MediaResult;

    /// Writes a fixed payload to the command's output instead of encoding.
    struct FakeRunner {
        calls: AtomicUsize,
        output: Option<Vec<u8>>,
        fail: bool,
    }

    impl FakeRunner {
        fn writing(bytes: &[u8]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                output: Some(bytes.to_vec()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                output: Some(b"partial".to_vec()),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(bytes) = &self.output {
                tokio::fs::write(cmd.output(), bytes).await?;
            }
            if self.fail {
                return Err(MediaError::ffmpeg_failed(
                    "FFmpeg exited with non-zero status",
                    Some("Error while decoding stream #0:0".to_string()),
                    Some(1),
                ));
            }
            Ok(())
        }
    }

    struct Fixture {
        _dir: TempDir,
        workspace: Workspace,
        job_id: JobId,
        audio: AudioArtifact,
    }

    async fn fixture(images: &[&str]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::new(dir.path());
        let job_id = JobId::from("job-1");
        let ns = workspace.namespace(&job_id).unwrap();
        ns.create().await.unwrap();

        for name in images {
            let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
                ImageBuffer::from_pixel(8, 8, Rgb([200, 100, 50]));
            img.save_with_format(ns.image_path(name), ImageFormat::Png)
                .unwrap();
        }

        let audio_path = ns.audio_path("mp3");
        tokio::fs::write(&audio_path, b"ID3 fake mp3").await.unwrap();

        Fixture {
            _dir: dir,
            workspace,
            job_id,
            audio: AudioArtifact::new(audio_path, AudioSource::Synthesized),
        }
    }

    fn assembler(runner: Arc<dyn CommandRunner>, workspace: &Workspace) -> ReelAssembler {
        ReelAssembler::new(
            runner,
            workspace.clone(),
            AssemblerConfig {
                probe_output: false,
                ..Default::default()
            },
        )
    }

    fn names(images: &[&str]) -> Vec<String> {
        images.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_assemble_writes_reel_and_manifest() {
        let fx = fixture(&["a.png", "b.png"]).await;
        let runner = Arc::new(FakeRunner::writing(b"mp4 bytes"));
        let asm = assembler(runner.clone(), &fx.workspace);

        let video = asm
            .assemble(&fx.job_id, &names(&["a.png", "b.png"]), &fx.audio, 3)
            .await
            .unwrap();

        let ns = fx.workspace.namespace(&fx.job_id).unwrap();
        assert_eq!(video.path, ns.reel_path());
        assert_eq!(video.size_bytes, 9);
        assert!(!ns.scratch_path().exists());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);

        let manifest = tokio::fs::read_to_string(ns.manifest_path()).await.unwrap();
        assert_eq!(
            manifest,
            "file 'a.png'\nduration 3\nfile 'b.png'\nduration 3\nfile 'b.png'\n"
        );
    }

    #[tokio::test]
    async fn test_no_images() {
        let fx = fixture(&[]).await;
        let runner = Arc::new(FakeRunner::writing(b"x"));
        let asm = assembler(runner.clone(), &fx.workspace);

        let err = asm.assemble(&fx.job_id, &[], &fx.audio, 1).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::NoImages);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_images_listed_and_no_video() {
        let fx = fixture(&["a.png"]).await;
        let runner = Arc::new(FakeRunner::writing(b"x"));
        let asm = assembler(runner.clone(), &fx.workspace);

        let err = asm
            .assemble(&fx.job_id, &names(&["a.png", "b.png", "c.png"]), &fx.audio, 1)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::MissingAsset);
        assert!(err.detail.contains("b.png") && err.detail.contains("c.png"));
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);

        let ns = fx.workspace.namespace(&fx.job_id).unwrap();
        assert!(!ns.reel_path().exists());
    }

    #[tokio::test]
    async fn test_non_image_rejected() {
        let fx = fixture(&["a.png"]).await;
        let ns = fx.workspace.namespace(&fx.job_id).unwrap();
        tokio::fs::write(ns.image_path("fake.jpg"), b"<html>").await.unwrap();
        let asm = assembler(Arc::new(FakeRunner::writing(b"x")), &fx.workspace);

        let err = asm
            .assemble(&fx.job_id, &names(&["a.png", "fake.jpg"]), &fx.audio, 1)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidAsset);
        assert!(err.detail.contains("fake.jpg"));
    }

    #[tokio::test]
    async fn test_empty_audio() {
        let fx = fixture(&["a.png"]).await;
        tokio::fs::write(&fx.audio.path, b"").await.unwrap();
        let asm = assembler(Arc::new(FakeRunner::writing(b"x")), &fx.workspace);

        let err = asm
            .assemble(&fx.job_id, &names(&["a.png"]), &fx.audio, 1)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::EmptyAudio);
    }

    #[tokio::test]
    async fn test_missing_audio_reports_its_note() {
        let fx = fixture(&["a.png"]).await;
        tokio::fs::remove_file(&fx.audio.path).await.unwrap();
        let audio = fx.audio.clone().with_note("writing silence failed: disk full");
        let runner = Arc::new(FakeRunner::writing(b"x"));
        let asm = assembler(runner.clone(), &fx.workspace);

        let err = asm
            .assemble(&fx.job_id, &names(&["a.png"]), &audio, 1)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::EmptyAudio);
        assert!(err.detail.contains("disk full"));
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_encoder_failure_cleans_scratch() {
        let fx = fixture(&["a.png"]).await;
        let asm = assembler(Arc::new(FakeRunner::failing()), &fx.workspace);

        let err = asm
            .assemble(&fx.job_id, &names(&["a.png"]), &fx.audio, 1)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::EncodeFailed);
        assert!(err.detail.contains("Error while decoding"));

        let ns = fx.workspace.namespace(&fx.job_id).unwrap();
        assert!(!ns.scratch_path().exists());
        assert!(!ns.reel_path().exists());
    }

    #[tokio::test]
    async fn test_empty_output_is_encode_failure() {
        let fx = fixture(&["a.png"]).await;
        let asm = assembler(Arc::new(FakeRunner::writing(b"")), &fx.workspace);

        let err = asm
            .assemble(&fx.job_id, &names(&["a.png"]), &fx.audio, 1)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::EncodeFailed);
        let ns = fx.workspace.namespace(&fx.job_id).unwrap();
        assert!(!ns.scratch_path().exists());
    }

    #[tokio::test]
    async fn test_encode_command_timeline() {
        let fx = fixture(&["a.png"]).await;
        let asm = assembler(Arc::new(FakeRunner::writing(b"x")), &fx.workspace);
        let ns = fx.workspace.namespace(&fx.job_id).unwrap();

        let args = asm.encode_command(&ns, &fx.audio, 6).build_args();
        let pos = |needle: &str| args.iter().position(|a| a == needle).unwrap();

        assert!(pos("-stream_loop") < pos(fx.audio.path.to_str().unwrap()));
        assert_eq!(args[pos("-t") + 1], "6.000");
        assert_eq!(args[pos("-c:v") + 1], "libx264");
        assert_eq!(args[pos("-c:a") + 1], "aac");
        let filter = &args[pos("-vf") + 1];
        assert!(filter.starts_with("scale=1080:1920:force_original_aspect_ratio=decrease"));
        assert!(filter.contains("fps=30"));
        assert!(filter.ends_with("format=yuv420p"));
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg"]
    async fn test_real_encode_matches_duration() {
        let fx = fixture(&["a.png", "b.png"]).await;
        let ns = fx.workspace.namespace(&fx.job_id).unwrap();
        let tone = ns.audio_path("mp3");
        let runner = Arc::new(crate::command::FfmpegRunner::new().with_timeout(120));
        crate::audio::generate_tone(runner.as_ref(), &tone, 1.0, 22_050)
            .await
            .unwrap();

        let asm = ReelAssembler::new(runner, fx.workspace.clone(), AssemblerConfig::default());
        let audio = AudioArtifact::new(tone, AudioSource::AmbientTone);
        let video = asm
            .assemble(&fx.job_id, &names(&["a.png", "b.png"]), &audio, 3)
            .await
            .unwrap();

        let info = video.info.unwrap();
        assert!((info.duration_secs - 6.0).abs() < 0.2);
        assert_eq!(info.format, "mp4");
    }
}
