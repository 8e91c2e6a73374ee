//! Fallback audio producers.
//!
//! Used when narration cannot be synthesized, in this order: a track from
//! the shared background pool, a generated tone, then native silence. The
//! last step needs no external tools so the chain always yields a file.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::command::{CommandRunner, FfmpegCommand};
use crate::error::MediaResult;
use crate::namespace::AUDIO_EXTENSIONS;

/// Frequency of the generated ambient tone (Hz)
pub const TONE_FREQUENCY_HZ: u32 = 220;
/// Output gain applied to the ambient tone
pub const TONE_VOLUME: f64 = 0.05;

/// Pick a background track for `seed` from `pool_dir`.
///
/// Candidates are non-empty files with a known audio extension, sorted by
/// name. The same seed always picks the same track for an unchanged pool.
pub async fn pick_background_track(pool_dir: impl AsRef<Path>, seed: &str) -> Option<PathBuf> {
    let mut entries = fs::read_dir(pool_dir.as_ref()).await.ok()?;
    let mut tracks = Vec::new();

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let known = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !known {
            continue;
        }
        match entry.metadata().await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => tracks.push(path),
            _ => {}
        }
    }

    if tracks.is_empty() {
        return None;
    }

    tracks.sort();
    let index = (fnv1a(seed.as_bytes()) % tracks.len() as u64) as usize;
    debug!(
        "Picked background track {} of {} for seed {}",
        index,
        tracks.len(),
        seed
    );
    tracks.into_iter().nth(index)
}

/// 64-bit FNV-1a. Stable across runs and platforms, unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

/// Build the FFmpeg command for a low-volume sine tone of `secs` seconds.
pub fn tone_command(output: impl AsRef<Path>, secs: f64, sample_rate: u32) -> FfmpegCommand {
    FfmpegCommand::lavfi(
        format!(
            "sine=frequency={}:sample_rate={}:duration={:.3}",
            TONE_FREQUENCY_HZ, sample_rate, secs
        ),
        output,
    )
    .output_arg("-af")
    .output_arg(format!("volume={}", TONE_VOLUME))
    .output_args(["-ac", "1"])
    .audio_codec("libmp3lame")
    .audio_bitrate("64k")
}

/// Generate an ambient tone with FFmpeg.
pub async fn generate_tone(
    runner: &dyn CommandRunner,
    output: impl AsRef<Path>,
    secs: f64,
    sample_rate: u32,
) -> MediaResult<()> {
    let cmd = tone_command(output, secs, sample_rate);
    runner.run(&cmd).await
}

/// Write `secs` seconds of 16-bit mono PCM silence as a WAV file.
pub async fn write_silence_wav(
    path: impl AsRef<Path>,
    secs: f64,
    sample_rate: u32,
) -> MediaResult<()> {
    fs::write(path.as_ref(), silence_wav_bytes(secs, sample_rate)).await?;
    Ok(())
}

fn silence_wav_bytes(secs: f64, sample_rate: u32) -> Vec<u8> {
    const CHANNELS: u16 = 1;
    const BITS_PER_SAMPLE: u16 = 16;

    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let byte_rate = sample_rate * u32::from(block_align);
    let samples = (secs.max(0.0) * f64::from(sample_rate)).round() as u32;
    let data_len = samples * u32::from(block_align);

    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&CHANNELS.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(44 + data_len as usize, 0);

    wav
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_silence_wav_header() {
        let wav = silence_wav_bytes(5.0, 22_050);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[36..40], b"data");

        let data_len = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_len, 5 * 22_050 * 2);
        assert_eq!(wav.len(), 44 + data_len as usize);
        assert!(wav[44..].iter().all(|b| *b == 0));
    }

    #[tokio::test]
    async fn test_write_silence_wav() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audio.wav");
        write_silence_wav(&path, 1.0, 8_000).await.unwrap();
        assert_eq!(fs::metadata(&path).await.unwrap().len(), 44 + 16_000);
    }

    #[tokio::test]
    async fn test_pick_background_track_is_deterministic() {
        let dir = TempDir::new().unwrap();
        for name in ["calm.mp3", "drive.m4a", "upbeat.wav"] {
            fs::write(dir.path().join(name), b"audio").await.unwrap();
        }
        fs::write(dir.path().join("empty.mp3"), b"").await.unwrap();
        fs::write(dir.path().join("notes.txt"), b"not audio").await.unwrap();

        let first = pick_background_track(dir.path(), "job-42").await.unwrap();
        let second = pick_background_track(dir.path(), "job-42").await.unwrap();
        assert_eq!(first, second);

        let name = first.file_name().unwrap().to_str().unwrap();
        assert!(["calm.mp3", "drive.m4a", "upbeat.wav"].contains(&name));
    }

    #[tokio::test]
    async fn test_pick_background_track_empty_pool() {
        let dir = TempDir::new().unwrap();
        assert!(pick_background_track(dir.path(), "job").await.is_none());
        assert!(pick_background_track(dir.path().join("missing"), "job")
            .await
            .is_none());
    }

    #[test]
    fn test_tone_command() {
        let args = tone_command("/tmp/audio.mp3", 5.0, 22_050).build_args();
        assert!(args.contains(&"lavfi".to_string()));
        assert!(args
            .iter()
            .any(|a| a.starts_with("sine=frequency=220:sample_rate=22050")));
        assert!(args.contains(&"volume=0.05".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/audio.mp3"));
    }

    #[test]
    fn test_fnv1a_known_value() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }
}
