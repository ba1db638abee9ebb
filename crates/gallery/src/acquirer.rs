//! Image acquisition: generate, download, persist.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use weathercanvas_core::artifact::GeneratedImage;
use weathercanvas_core::error::AcquisitionError;
use weathercanvas_core::image::{ImageFetcher, ImageGenerator, ImageOptions, ImageRequest};

use crate::store::ImageStore;

pub struct ImageAcquirer {
    generator: Arc<dyn ImageGenerator>,
    fetcher: Arc<dyn ImageFetcher>,
    store: ImageStore,
}

impl ImageAcquirer {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        fetcher: Arc<dyn ImageFetcher>,
        store: ImageStore,
    ) -> Self {
        Self {
            generator,
            fetcher,
            store,
        }
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    /// Turn a prompt into a stored image.
    ///
    /// Nothing is written unless generation and download both succeed.
    pub async fn acquire(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<GeneratedImage, AcquisitionError> {
        let request = ImageRequest::new(prompt, options);

        let source_url = self.generator.generate(&request).await.inspect_err(|e| {
            warn!(error = %e, model = %options.model, "Image generation failed");
        })?;

        let bytes = self.fetcher.fetch(&source_url).await.inspect_err(|e| {
            warn!(error = %e, "Image download failed");
        })?;

        let created_at = Utc::now();
        let (file_name, stored_path) = self.store.persist(&bytes, created_at).await?;

        let image = GeneratedImage {
            source_url,
            byte_len: bytes.len(),
            local_path: ImageStore::local_path(&file_name),
            full_url: self.store.full_url(&file_name),
            file_name,
            stored_path,
            created_at,
        };

        info!(file = %image.file_name, bytes = image.byte_len, "Image acquired");
        Ok(image)
    }
}
