//! Upload pipeline: persist the file, then optionally shrink it.
//!
//! Image post-processing is best effort. When decoding or resizing fails the
//! original bytes stay on disk and the upload still succeeds; the failure is
//! only logged.

use std::sync::Arc;

use bytes::Bytes;
use metrics::counter;
use thiserror::Error;
use tracing::{info, warn};

use crate::infra::{
    images::{ImageProcessor, ResizeOutcome},
    uploads::{StoredUpload, UploadStorage, UploadStorageError},
};

const SOURCE: &str = "quillpost::application::uploads";

#[derive(Debug, Error)]
pub enum UploadServiceError {
    #[error("failed to store uploaded file")]
    Storage(#[from] UploadStorageError),
}

#[derive(Clone)]
pub struct UploadService {
    storage: Arc<UploadStorage>,
    processor: Option<ImageProcessor>,
}

impl UploadService {
    /// `processor` is `None` when image post-processing is disabled.
    pub fn new(storage: Arc<UploadStorage>, processor: Option<ImageProcessor>) -> Self {
        Self { storage, processor }
    }

    pub fn storage(&self) -> &Arc<UploadStorage> {
        &self.storage
    }

    /// Persist `data` and return the stored upload. The returned
    /// `public_path` is what gets referenced from posts and editor content.
    pub async fn save(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<StoredUpload, UploadServiceError> {
        let stored = self.storage.store(original_name, data).await?;
        counter!("quillpost_uploads_stored_total").increment(1);
        info!(
            target = SOURCE,
            original_name,
            stored_name = %stored.stored_name,
            size_bytes = stored.size_bytes,
            "upload stored"
        );

        if let Some(processor) = self.processor {
            self.shrink(processor, &stored).await;
        }

        Ok(stored)
    }

    async fn shrink(&self, processor: ImageProcessor, stored: &StoredUpload) {
        let path = stored.absolute_path.clone();
        let result =
            tokio::task::spawn_blocking(move || processor.constrain_width(&path)).await;

        match result {
            Ok(Ok(ResizeOutcome::Resized { from, to })) => {
                counter!("quillpost_images_resized_total").increment(1);
                info!(
                    target = SOURCE,
                    stored_name = %stored.stored_name,
                    from_width = from.0,
                    from_height = from.1,
                    to_width = to.0,
                    to_height = to.1,
                    "image resized"
                );
            }
            Ok(Ok(ResizeOutcome::Unchanged { .. })) => {}
            Ok(Err(err)) => {
                counter!("quillpost_image_processing_failures_total").increment(1);
                warn!(
                    target = SOURCE,
                    stored_name = %stored.stored_name,
                    error = %err,
                    "image post-processing failed; keeping original upload"
                );
            }
            Err(err) => {
                counter!("quillpost_image_processing_failures_total").increment(1);
                warn!(
                    target = SOURCE,
                    stored_name = %stored.stored_name,
                    error = %err,
                    "image post-processing task aborted; keeping original upload"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Bytes {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut buf, ImageFormat::Png)
            .expect("encode png");
        Bytes::from(buf.into_inner())
    }

    fn service(dir: &tempfile::TempDir, resize: bool) -> UploadService {
        let storage =
            Arc::new(UploadStorage::new(dir.path().to_path_buf()).expect("upload storage"));
        UploadService::new(storage, resize.then(|| ImageProcessor::new(800)))
    }

    #[tokio::test]
    async fn wide_upload_is_shrunk_when_enabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let stored = service(&dir, true)
            .save("banner.png", png_bytes(1200, 600))
            .await
            .expect("save");

        let dims = image::image_dimensions(&stored.absolute_path).expect("dimensions");
        assert_eq!(dims, (800, 400));
    }

    #[tokio::test]
    async fn wide_upload_is_kept_when_disabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let stored = service(&dir, false)
            .save("banner.png", png_bytes(1200, 600))
            .await
            .expect("save");

        let dims = image::image_dimensions(&stored.absolute_path).expect("dimensions");
        assert_eq!(dims, (1200, 600));
    }

    #[tokio::test]
    async fn undecodable_upload_still_succeeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let stored = service(&dir, true)
            .save("fake.jpg", Bytes::from_static(b"not really a jpeg"))
            .await
            .expect("processing failure is not fatal");

        assert!(stored.public_path.starts_with("/uploads/fake_"));
        assert_eq!(
            std::fs::read(&stored.absolute_path).expect("read"),
            b"not really a jpeg"
        );
    }

    #[tokio::test]
    async fn wide_decode_only_upload_keeps_original_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let original = crate::infra::images::dxt1_dds(1024, 4);
        let stored = service(&dir, true)
            .save("texture.dds", Bytes::from(original.clone()))
            .await
            .expect("processing failure is not fatal");

        assert_eq!(std::fs::read(&stored.absolute_path).expect("read"), original);
    }

    #[tokio::test]
    async fn identical_names_get_distinct_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(&dir, true);

        let first = service
            .save("same.png", png_bytes(10, 10))
            .await
            .expect("first");
        let second = service
            .save("same.png", png_bytes(20, 20))
            .await
            .expect("second");

        assert_ne!(first.public_path, second.public_path);
        assert_eq!(
            image::image_dimensions(&first.absolute_path).expect("first dims"),
            (10, 10)
        );
        assert_eq!(
            image::image_dimensions(&second.absolute_path).expect("second dims"),
            (20, 20)
        );
    }
}
