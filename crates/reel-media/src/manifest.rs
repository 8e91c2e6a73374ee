//! FFmpeg concat demuxer manifests.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::MediaResult;

/// Quote a path for a concat manifest `file` directive.
///
/// Single quotes are closed, escaped and reopened: `it's` becomes `'it'\''s'`.
pub fn quote_concat_path(path: &str) -> String {
    format!("'{}'", path.replace('\'', r"'\''"))
}

/// Render the manifest showing each image for `duration_secs`.
///
/// The concat demuxer ignores the duration of the final entry, so the last
/// image is listed once more without one.
pub fn render_manifest<S: AsRef<str>>(images: &[S], duration_secs: u32) -> String {
    let mut manifest = String::new();

    for image in images {
        let _ = writeln!(manifest, "file {}", quote_concat_path(image.as_ref()));
        let _ = writeln!(manifest, "duration {}", duration_secs);
    }

    if let Some(last) = images.last() {
        let _ = writeln!(manifest, "file {}", quote_concat_path(last.as_ref()));
    }

    manifest
}

/// Write the manifest to `path`.
pub async fn write_manifest<S: AsRef<str>>(
    path: impl AsRef<Path>,
    images: &[S],
    duration_secs: u32,
) -> MediaResult<()> {
    tokio::fs::write(path.as_ref(), render_manifest(images, duration_secs)).await?;
    Ok(())
}
