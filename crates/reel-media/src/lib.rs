//! FFmpeg CLI wrapper and slideshow assembly for reels.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building (argument vectors, never a shell)
//! - A runner with bounded timeouts and captured diagnostics
//! - Content-sniffing image validation
//! - Concat manifests and the reel assembler
//! - Fallback audio producers (background pool, tone, silence)

pub mod assembler;
pub mod audio;
pub mod command;
pub mod error;
pub mod fs_utils;
pub mod image_check;
pub mod manifest;
pub mod namespace;
pub mod probe;
pub mod progress;

pub use assembler::{AssemblerConfig, ReelAssembler};
pub use audio::{generate_tone, pick_background_track, write_silence_wav};
pub use command::{check_ffmpeg, check_ffprobe, CommandRunner, FfmpegCommand, FfmpegRunner};
pub use error::{AssemblyError, MediaError, MediaResult};
pub use image_check::{sniff_image, ImageMeta};
pub use namespace::{JobNamespace, Workspace};
pub use probe::{probe_video, ProbeInfo};
pub use progress::FfmpegProgress;
