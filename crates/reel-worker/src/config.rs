//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use reel_models::encoding::{FALLBACK_AUDIO_SECS, FALLBACK_SAMPLE_RATE, REEL_HEIGHT, REEL_WIDTH};
use reel_models::EncodingConfig;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root for job namespaces and the background-track pool
    pub work_dir: PathBuf,
    /// How often the poll loop scans for pending jobs
    pub poll_interval: Duration,
    /// In-flight jobs untouched for this long are resumed by the poll loop
    pub stale_after: Duration,
    /// Upper bound on a single FFmpeg invocation
    pub encode_timeout: Duration,
    /// Reel encoding parameters
    pub encoding: EncodingConfig,
    /// Voice API attempts before falling back
    pub voice_max_attempts: u32,
    /// Upload attempts before keeping the local copy
    pub publish_max_attempts: u32,
    /// Base delay for stage retry backoff
    pub retry_base_delay: Duration,
    /// Length of generated fallback audio
    pub fallback_audio_secs: f64,
    /// Sample rate of generated fallback audio
    pub fallback_sample_rate: u32,
    /// Probe finished reels with ffprobe
    pub probe_output: bool,
    /// Grace period for the in-flight job on shutdown
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/reels"),
            poll_interval: Duration::from_secs(5),
            stale_after: Duration::from_secs(900), // 15 minutes
            encode_timeout: Duration::from_secs(600),
            encoding: EncodingConfig::default(),
            voice_max_attempts: 3,
            publish_max_attempts: 3,
            retry_base_delay: Duration::from_millis(500),
            fallback_audio_secs: FALLBACK_AUDIO_SECS,
            fallback_sample_rate: FALLBACK_SAMPLE_RATE,
            probe_output: true,
            shutdown_timeout: Duration::from_secs(660),
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let encoding = EncodingConfig {
            width: env_or("REEL_WIDTH", REEL_WIDTH),
            height: env_or("REEL_HEIGHT", REEL_HEIGHT),
            ..EncodingConfig::default()
        };
        let encode_timeout = Duration::from_secs(env_or("ENCODE_TIMEOUT_SECS", 600));

        Self {
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            poll_interval: Duration::from_secs(env_or("WORKER_POLL_INTERVAL_SECS", 5)),
            stale_after: Duration::from_secs(env_or("WORKER_STALE_AFTER_SECS", 900)),
            encode_timeout,
            encoding,
            voice_max_attempts: env_or::<u32>("VOICE_MAX_ATTEMPTS", 3).max(1),
            publish_max_attempts: env_or::<u32>("PUBLISH_MAX_ATTEMPTS", 3).max(1),
            retry_base_delay: Duration::from_millis(env_or("STAGE_RETRY_BASE_DELAY_MS", 500)),
            fallback_audio_secs: defaults.fallback_audio_secs,
            fallback_sample_rate: defaults.fallback_sample_rate,
            probe_output: env_or("PROBE_OUTPUT", true),
            shutdown_timeout: encode_timeout + Duration::from_secs(60),
        }
    }

    /// Stale threshold never shorter than one encode, so a running job is not resumed twice.
    pub fn effective_stale_after(&self) -> Duration {
        self.stale_after.max(self.encode_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.encoding.even_dimensions(), (1080, 1920));
        assert_eq!(config.voice_max_attempts, 3);
        assert!(config.effective_stale_after() >= config.encode_timeout);
    }

    #[test]
    fn test_effective_stale_after() {
        let config = WorkerConfig {
            stale_after: Duration::from_secs(10),
            encode_timeout: Duration::from_secs(60),
            ..Default::default()
        };
        assert_eq!(config.effective_stale_after(), Duration::from_secs(60));
    }
}
