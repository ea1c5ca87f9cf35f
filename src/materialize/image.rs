//! Deferred thumbnail fetch, bound/resize and in-memory compression.

use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::catalog::ImageId;
use crate::providers::{ImageFileFormat, ThumbnailProvider};

/// JPEG quality used when re-encoding a bound thumbnail.
const COMPRESSION_QUALITY: u8 = 85;

/// A processed template image, held compressed in memory.
#[derive(Clone)]
pub struct CompressedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for CompressedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// An in-flight thumbnail fetch.
///
/// The task runs concurrently with the rest of the pipeline: the
/// materializer fires it and continues, and the result is bound at the
/// call site's convenience. Awaitable through [`ImageTask::bind`],
/// cancellable through [`ImageTask::abort`]. Any failure inside the task
/// resolves to `None`; a template never fails because of its image.
pub struct ImageTask {
    handle: JoinHandle<Option<CompressedImage>>,
}

impl ImageTask {
    pub fn spawn(
        provider: Arc<dyn ThumbnailProvider>,
        image_id: ImageId,
        format: ImageFileFormat,
        max_width: u32,
        max_height: u32,
    ) -> Self {
        let handle = tokio::spawn(async move {
            match provider.thumbnail(&image_id, format).await {
                Ok(Some(image)) => process_thumbnail(image, max_width, max_height),
                Ok(None) => {
                    debug!(image = %image_id, "thumbnail service had no image");
                    None
                }
                Err(error) => {
                    warn!(image = %image_id, error = %error, "thumbnail fetch failed");
                    None
                }
            }
        });
        Self { handle }
    }

    /// Await the fetched, processed image. An aborted or failed task binds
    /// as `None`.
    pub async fn bind(self) -> Option<CompressedImage> {
        self.handle.await.ok().flatten()
    }

    /// Cancel the fetch; a later `bind` resolves to `None`.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

/// Dimensions after bounding to `max_width` × `max_height`, preserving
/// aspect ratio and never upscaling.
pub fn bounded_dimensions(
    width: u32,
    height: u32,
    max_width: u32,
    max_height: u32,
) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }
    let ratio = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    let bounded_width = ((width as f64 * ratio).round() as u32).max(1);
    let bounded_height = ((height as f64 * ratio).round() as u32).max(1);
    (bounded_width, bounded_height)
}

/// Bound and compress a fetched thumbnail. Returns `None` when encoding
/// fails; the caller binds the placeholder state instead.
pub(crate) fn process_thumbnail(
    image: DynamicImage,
    max_width: u32,
    max_height: u32,
) -> Option<CompressedImage> {
    let (target_width, target_height) =
        bounded_dimensions(image.width(), image.height(), max_width, max_height);
    let bounded = if (target_width, target_height) == (image.width(), image.height()) {
        image
    } else {
        image.thumbnail(max_width, max_height)
    };

    let width = bounded.width();
    let height = bounded.height();
    let rgb = bounded.to_rgb8();

    let mut data = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut data, COMPRESSION_QUALITY);
    match rgb.write_with_encoder(encoder) {
        Ok(()) => Some(CompressedImage {
            data,
            width,
            height,
        }),
        Err(error) => {
            warn!(error = %error, "thumbnail compression failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::StaticThumbnails;

    #[test]
    fn test_bounded_dimensions_never_upscale() {
        assert_eq!(bounded_dimensions(100, 50, 512, 512), (100, 50));
        assert_eq!(bounded_dimensions(512, 512, 512, 512), (512, 512));
    }

    #[test]
    fn test_bounded_dimensions_preserve_aspect() {
        assert_eq!(bounded_dimensions(1024, 512, 512, 512), (512, 256));
        assert_eq!(bounded_dimensions(512, 2048, 512, 512), (128, 512));
    }

    #[test]
    fn test_process_thumbnail_downscales_and_compresses() {
        let image = DynamicImage::new_rgb8(1024, 256);
        let compressed = process_thumbnail(image, 512, 512).unwrap();
        assert_eq!((compressed.width, compressed.height), (512, 128));
        assert!(!compressed.data.is_empty());
        // JPEG magic bytes
        assert_eq!(&compressed.data[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_task_binds_fetched_image() {
        let provider = Arc::new(StaticThumbnails::with_image(DynamicImage::new_rgb8(64, 64)));
        let id = ImageId::parse("6f9619ff-8b86-d011-b42d-00c04fc964ff").unwrap();
        let task = ImageTask::spawn(provider, id, ImageFileFormat::Png, 512, 512);

        let bound = task.bind().await.unwrap();
        assert_eq!((bound.width, bound.height), (64, 64));
    }

    #[tokio::test]
    async fn test_aborted_task_binds_nothing() {
        let provider = Arc::new(StaticThumbnails::default());
        let id = ImageId::parse("6f9619ff-8b86-d011-b42d-00c04fc964ff").unwrap();
        let task = ImageTask::spawn(provider, id, ImageFileFormat::Png, 512, 512);
        task.abort();
        assert!(task.bind().await.is_none());
    }
}
