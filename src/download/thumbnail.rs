//! Thumbnail processing for video deliveries.
//!
//! Fetches the source thumbnail, crops the largest centered square, scales
//! it to a fixed edge with Lanczos3 and re-encodes it as JPEG. Failures are
//! logged and absorbed; a video is simply sent without a thumbnail.

use crate::core::config::ThumbnailConfig;
use image::imageops::FilterType;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the processed thumbnail inside the workspace
pub const THUMBNAIL_FILE_NAME: &str = "thumb_cropped.jpg";

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("unsupported image format")]
    UnsupportedFormat,
    #[error("image decode/encode failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("empty image")]
    Empty,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("processing task failed: {0}")]
    Join(String),
}

/// Image format detected by magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Unknown,
}

/// Detects image format from the first bytes of a file (magic bytes)
pub(crate) fn detect_image_format(bytes: &[u8]) -> ImageFormat {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => ImageFormat::Jpeg,
        [0x89, b'P', b'N', b'G', ..] => ImageFormat::Png,
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => ImageFormat::WebP,
        _ => ImageFormat::Unknown,
    }
}

/// Largest centered square: `(x, y, side)`.
///
/// ```
/// use mediarelay::download::thumbnail::square_crop_region;
///
/// assert_eq!(square_crop_region(1920, 1080), (420, 0, 1080));
/// ```
pub fn square_crop_region(width: u32, height: u32) -> (u32, u32, u32) {
    let side = width.min(height);
    ((width - side) / 2, (height - side) / 2, side)
}

/// Center-crops to a square, resizes to `target`×`target` and encodes JPEG.
pub fn crop_center_square_and_resize(bytes: &[u8], target: u32) -> Result<Vec<u8>, ThumbnailError> {
    if detect_image_format(bytes) == ImageFormat::Unknown {
        return Err(ThumbnailError::UnsupportedFormat);
    }

    let img = image::load_from_memory(bytes)?;
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(ThumbnailError::Empty);
    }

    let (x, y, side) = square_crop_region(width, height);
    let square = img.crop_imm(x, y, side, side);
    let resized = square.resize_exact(target, target, FilterType::Lanczos3);

    // JPEG has no alpha channel
    let rgb = image::DynamicImage::ImageRgb8(resized.to_rgb8());
    let mut out = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Jpeg)?;
    Ok(out)
}

/// Downloads and converts thumbnails into a job workspace.
#[derive(Debug, Clone)]
pub struct ThumbnailProcessor {
    client: reqwest::Client,
    config: ThumbnailConfig,
}

impl ThumbnailProcessor {
    pub fn new(config: ThumbnailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Returns the path of the processed JPEG, or `None` on any failure.
    pub async fn process(&self, thumbnail_url: &str, workspace: &Path) -> Option<PathBuf> {
        match self.try_process(thumbnail_url, workspace).await {
            Ok(path) => {
                log::info!("[THUMBNAIL] saved {}", path.display());
                Some(path)
            }
            Err(e) => {
                log::warn!("[THUMBNAIL] skipped for {}: {}", thumbnail_url, e);
                None
            }
        }
    }

    async fn try_process(&self, thumbnail_url: &str, workspace: &Path) -> Result<PathBuf, ThumbnailError> {
        let response = self
            .client
            .get(thumbnail_url)
            .timeout(self.config.timeout)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;

        log::debug!(
            "[THUMBNAIL] fetched {} bytes ({:?})",
            bytes.len(),
            detect_image_format(&bytes)
        );

        let target = self.config.size;
        let jpeg = tokio::task::spawn_blocking(move || crop_center_square_and_resize(&bytes, target))
            .await
            .map_err(|e| ThumbnailError::Join(e.to_string()))??;

        let path = workspace.join(THUMBNAIL_FILE_NAME);
        fs_err::tokio::write(&path, jpeg).await?;
        Ok(path)
    }
}
