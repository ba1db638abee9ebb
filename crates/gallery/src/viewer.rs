//! Latest-image reader with a reference-keyed cache.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;
use weathercanvas_core::artifact::ImageReference;
use weathercanvas_core::error::StorageError;
use weathercanvas_core::state::CanvasState;

use crate::store::ImageStore;

struct Cached {
    reference: ImageReference,
    bytes: Arc<[u8]>,
}

/// Serves the bytes of the most recently published image.
///
/// Bytes are re-read only when the published reference changes. If the
/// referenced file has been evicted the viewer reports nothing.
pub struct ImageViewer {
    store: ImageStore,
    state: Arc<CanvasState>,
    cache: Mutex<Option<Cached>>,
}

impl ImageViewer {
    pub fn new(store: ImageStore, state: Arc<CanvasState>) -> Self {
        Self {
            store,
            state,
            cache: Mutex::new(None),
        }
    }

    pub async fn latest(&self) -> Result<Option<(ImageReference, Arc<[u8]>)>, StorageError> {
        let Some(reference) = self.state.latest_image().await else {
            return Ok(None);
        };

        let mut cache = self.cache.lock().await;

        let still_present = tokio::fs::try_exists(self.store.directory().join(&reference.file_name))
            .await
            .unwrap_or(false);
        if !still_present {
            debug!(file = %reference.file_name, "Published image no longer on disk");
            *cache = None;
            return Ok(None);
        }

        if let Some(cached) = cache.as_ref().filter(|c| c.reference == reference) {
            return Ok(Some((reference, cached.bytes.clone())));
        }

        let Some(bytes) = self.store.read(&reference.file_name).await? else {
            *cache = None;
            return Ok(None);
        };
        let bytes: Arc<[u8]> = bytes.into();

        debug!(file = %reference.file_name, bytes = bytes.len(), "Image cache refreshed");
        *cache = Some(Cached {
            reference: reference.clone(),
            bytes: bytes.clone(),
        });
        Ok(Some((reference, bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    async fn publish(state: &CanvasState, store: &ImageStore, bytes: &[u8]) -> ImageReference {
        let created_at = Utc::now();
        let (file_name, _) = store.persist(bytes, created_at).await.unwrap();
        let reference = ImageReference {
            local_path: ImageStore::local_path(&file_name),
            full_url: store.full_url(&file_name),
            file_name,
            created_at,
        };
        state.publish_image(reference.clone()).await;
        reference
    }

    #[tokio::test]
    async fn nothing_published_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let viewer = ImageViewer::new(
            ImageStore::new(dir.path(), "dalle", "http://x"),
            Arc::new(CanvasState::new()),
        );
        assert!(viewer.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn serves_and_caches_latest() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path(), "dalle", "http://x");
        let state = Arc::new(CanvasState::new());
        let viewer = ImageViewer::new(store.clone(), state.clone());

        let reference = publish(&state, &store, b"first").await;
        let (seen, bytes) = viewer.latest().await.unwrap().unwrap();
        assert_eq!(seen, reference);
        assert_eq!(&*bytes, b"first");

        let (_, again) = viewer.latest().await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&bytes, &again));
    }

    #[tokio::test]
    async fn evicted_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path(), "dalle", "http://x");
        let state = Arc::new(CanvasState::new());
        let viewer = ImageViewer::new(store.clone(), state.clone());

        let reference = publish(&state, &store, b"short-lived").await;
        assert!(viewer.latest().await.unwrap().is_some());

        std::fs::remove_file(dir.path().join(&reference.file_name)).unwrap();
        assert!(viewer.latest().await.unwrap().is_none());
    }
}
