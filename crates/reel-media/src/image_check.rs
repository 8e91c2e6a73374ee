//! Image validation by content sniffing.
//!
//! File extensions are not trusted: the header bytes decide the format and
//! the decoder must be able to read the dimensions.

use image::ImageFormat;
use serde::Serialize;
use std::path::Path;

use crate::error::{MediaError, MediaResult};

/// Format and size of a validated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageMeta {
    #[serde(skip)]
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

/// Sniff an image file and read its dimensions.
///
/// Returns [`MediaError::FileNotFound`] for missing files and
/// [`MediaError::InvalidImage`] for anything the decoder cannot identify.
pub async fn sniff_image(path: impl AsRef<Path>) -> MediaResult<ImageMeta> {
    let path = path.as_ref().to_path_buf();

    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(MediaError::FileNotFound(path));
    }

    tokio::task::spawn_blocking(move || sniff_blocking(&path))
        .await
        .map_err(|e| MediaError::internal(format!("image sniff task failed: {}", e)))?
}

fn sniff_blocking(path: &Path) -> MediaResult<ImageMeta> {
    let invalid = |reason: String| MediaError::InvalidImage {
        path: path.to_path_buf(),
        reason,
    };

    let reader = image::ImageReader::open(path)?
        .with_guessed_format()
        .map_err(|e| invalid(e.to_string()))?;

    let format = reader
        .format()
        .ok_or_else(|| invalid("unrecognized image format".to_string()))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| invalid(e.to_string()))?;

    if width == 0 || height == 0 {
        return Err(invalid("image has zero dimensions".to_string()));
    }

    Ok(ImageMeta {
        format,
        width,
        height,
    })
}
