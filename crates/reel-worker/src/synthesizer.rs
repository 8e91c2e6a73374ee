//! Narration synthesis with a fallback chain.
//!
//! [`VoiceSynthesizer::synthesize`] always leaves an audio artifact in the job
//! namespace. When the voice API is unavailable it substitutes, in order, a
//! background track from the shared pool, a generated ambient tone, and
//! natively written silence.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use reel_media::fs_utils::{is_non_empty_file, remove_if_exists};
use reel_media::namespace::AUDIO_EXTENSIONS;
use reel_media::{
    generate_tone, pick_background_track, write_silence_wav, CommandRunner, JobNamespace,
    Workspace,
};
use reel_models::{AudioArtifact, AudioSource};
use reel_voice::{SpeechSynthesis, VoiceError, VoiceResult};

use crate::logging::JobLogger;
use crate::metrics;
use crate::retry::StagePolicy;

/// Produces the audio track for a job.
pub struct VoiceSynthesizer {
    voice: Arc<dyn SpeechSynthesis>,
    runner: Arc<dyn CommandRunner>,
    workspace: Workspace,
    policy: StagePolicy,
    fallback_secs: f64,
    sample_rate: u32,
}

impl VoiceSynthesizer {
    pub fn new(
        voice: Arc<dyn SpeechSynthesis>,
        runner: Arc<dyn CommandRunner>,
        workspace: Workspace,
        policy: StagePolicy,
        fallback_secs: f64,
        sample_rate: u32,
    ) -> Self {
        Self {
            voice,
            runner,
            workspace,
            policy,
            fallback_secs,
            sample_rate,
        }
    }

    /// Synthesize narration for `text` into `ns`.
    ///
    /// Never fails: any problem with the voice API ends in a fallback source,
    /// recorded on the returned artifact.
    pub async fn synthesize(&self, text: &str, ns: &JobNamespace) -> AudioArtifact {
        let logger = JobLogger::new(ns.job_id(), "synthesis");

        if let Err(e) = ns.create().await {
            logger.log_warning(&format!("could not create namespace: {}", e));
        }
        self.clear_stale_audio(ns).await;

        if text.trim().is_empty() {
            return self.fallback(ns, &logger, "description is empty").await;
        }
        if !self.voice.is_configured() {
            return self.fallback(ns, &logger, "voice API is not configured").await;
        }

        self.policy
            .run_or_fallback(
                || self.narrate(text, ns),
                |e: &VoiceError| e.is_retryable(),
                |error| self.fallback_after(ns, &logger, error),
            )
            .await
    }

    /// One call to the voice API, written to `audio.<ext>`.
    async fn narrate(&self, text: &str, ns: &JobNamespace) -> VoiceResult<AudioArtifact> {
        let bytes = self.voice.synthesize(text).await?;
        let path = ns.audio_path(self.voice.output_extension());
        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            let _ = remove_if_exists(&path).await;
            return Err(e.into());
        }
        debug!(
            job_id = %ns.job_id(),
            bytes = bytes.len(),
            "Narration written to {}",
            path.display()
        );
        Ok(AudioArtifact::new(path, AudioSource::Synthesized))
    }

    async fn fallback_after(
        &self,
        ns: &JobNamespace,
        logger: &JobLogger,
        error: VoiceError,
    ) -> AudioArtifact {
        let reason = format!("voice API failed: {}", error);
        self.fallback(ns, logger, &reason).await
    }

    /// Remove audio left by an earlier run so only one audio artifact exists.
    async fn clear_stale_audio(&self, ns: &JobNamespace) {
        for ext in AUDIO_EXTENSIONS {
            if let Ok(true) = remove_if_exists(ns.audio_path(ext)).await {
                debug!(job_id = %ns.job_id(), "Removed stale audio.{}", ext);
            }
        }
    }

    async fn fallback(&self, ns: &JobNamespace, logger: &JobLogger, reason: &str) -> AudioArtifact {
        let audio = self.fallback_audio(ns, logger).await;
        logger.log_audio_fallback(audio.source, reason);
        metrics::record_audio_fallback(audio.source.as_str());
        audio
    }

    async fn fallback_audio(&self, ns: &JobNamespace, logger: &JobLogger) -> AudioArtifact {
        if let Some(track) =
            pick_background_track(self.workspace.background_dir(), ns.job_id().as_str()).await
        {
            let ext = track
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_else(|| "mp3".to_string());
            let dest = ns.audio_path(&ext);
            match copy_non_empty(&track, &dest).await {
                Ok(()) => return AudioArtifact::new(dest, AudioSource::BackgroundTrack),
                Err(e) => {
                    logger.log_warning(&format!(
                        "background track {} unusable: {}",
                        track.display(),
                        e
                    ));
                    let _ = remove_if_exists(&dest).await;
                }
            }
        }

        let tone = ns.audio_path("mp3");
        match generate_tone(
            self.runner.as_ref(),
            &tone,
            self.fallback_secs,
            self.sample_rate,
        )
        .await
        {
            Ok(()) if is_non_empty_file(&tone).await => {
                return AudioArtifact::new(tone, AudioSource::AmbientTone)
            }
            Ok(()) => logger.log_warning("tone generator produced no output"),
            Err(e) => logger.log_warning(&format!("tone generation failed: {}", e)),
        }
        let _ = remove_if_exists(&tone).await;

        let silence = ns.audio_path("wav");
        let artifact = AudioArtifact::new(&silence, AudioSource::Silence);
        match write_silence_wav(&silence, self.fallback_secs, self.sample_rate).await {
            Ok(()) => artifact,
            Err(e) => {
                let note = format!("writing silence failed: {}", e);
                logger.log_error(&note);
                artifact.with_note(note)
            }
        }
    }
}

async fn copy_non_empty(src: &Path, dest: &Path) -> std::io::Result<()> {
    let copied = tokio::fs::copy(src, dest).await?;
    if copied == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "track is empty",
        ));
    }
    Ok(())
}
