//! Resize/recompress engine built on the `image` crate.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use tracing::debug;

use crate::domain::entities::{ImageFormat, TransformOptions};
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::{FileSystemPort, StoredFile, TransformPort};

/// Produces derivatives by decoding, optionally downscaling, and re-encoding.
pub struct ImageTransformer {
    fs: Arc<dyn FileSystemPort>,
}

impl std::fmt::Debug for ImageTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageTransformer").finish_non_exhaustive()
    }
}

impl ImageTransformer {
    /// Creates a transformer that reads and writes through `fs`.
    #[must_use]
    pub fn new(fs: Arc<dyn FileSystemPort>) -> Self {
        Self { fs }
    }
}

/// Computes output dimensions, or `None` when the source can be kept as is.
///
/// Aspect ratio is always preserved and images are never upscaled.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn target_dimensions(
    src_width: u32,
    src_height: u32,
    width: Option<u32>,
    height: Option<u32>,
) -> Option<(u32, u32)> {
    if src_width == 0 || src_height == 0 {
        return None;
    }

    let sx = width.map_or(f64::INFINITY, |w| f64::from(w) / f64::from(src_width));
    let sy = height.map_or(f64::INFINITY, |h| f64::from(h) / f64::from(src_height));
    let scale = sx.min(sy);

    if !scale.is_finite() || scale >= 1.0 {
        return None;
    }

    let w = (f64::from(src_width) * scale).round().max(1.0) as u32;
    let h = (f64::from(src_height) * scale).round().max(1.0) as u32;
    Some((w, h))
}

fn encode(image: &DynamicImage, options: &TransformOptions) -> Result<Vec<u8>, String> {
    let mut buf = Vec::new();
    match options.format {
        ImageFormat::Jpeg => {
            let rgb = image.to_rgb8();
            let quality = options.quality_percent().max(1);
            JpegEncoder::new_with_quality(&mut buf, quality)
                .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
                .map_err(|e| format!("JPEG encode failed: {e}"))?;
        }
        ImageFormat::Png => {
            image
                .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                .map_err(|e| format!("PNG encode failed: {e}"))?;
        }
    }
    Ok(buf)
}

fn transform_bytes(bytes: &[u8], options: &TransformOptions) -> Result<Vec<u8>, String> {
    let img = image::load_from_memory(bytes).map_err(|e| format!("Decode failed: {e}"))?;

    let img = match target_dimensions(img.width(), img.height(), options.width, options.height) {
        Some((w, h)) => img.resize_exact(w, h, FilterType::Lanczos3),
        None => img,
    };

    encode(&img, options)
}

#[async_trait]
impl TransformPort for ImageTransformer {
    async fn transform(
        &self,
        source: &Path,
        dest: &Path,
        options: &TransformOptions,
    ) -> CacheResult<StoredFile> {
        let bytes = self
            .fs
            .read(source)
            .await
            .map_err(|e| CacheError::transform(e.to_string()))?
            .ok_or_else(|| {
                CacheError::transform(format!("Source not found: {}", source.display()))
            })?;

        let opts = *options;
        let encoded = tokio::task::spawn_blocking(move || transform_bytes(&bytes, &opts))
            .await
            .map_err(|e| CacheError::transform(format!("Transform task panicked: {e}")))?
            .map_err(CacheError::transform)?;

        self.fs
            .write_atomic(dest, &encoded)
            .await
            .map_err(|e| CacheError::transform(e.to_string()))?;

        debug!(
            source = %source.display(),
            dest = %dest.display(),
            size = encoded.len(),
            options = %options.descriptor(),
            "Wrote derivative"
        );

        Ok(StoredFile {
            path: dest.to_path_buf(),
            size_bytes: encoded.len() as u64,
        })
    }
}
