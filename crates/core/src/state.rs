//! Shared canvas state — the latest published prompt and image.
//!
//! Owned by the orchestrator and handed explicitly to every consumer; there
//! is no ambient global state.

use tokio::sync::RwLock;

use crate::artifact::{ImageReference, PromptBundle};

#[derive(Debug, Default)]
pub struct CanvasState {
    latest_prompt: RwLock<Option<PromptBundle>>,
    latest_image: RwLock<Option<ImageReference>>,
}

impl CanvasState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn latest_prompt(&self) -> Option<PromptBundle> {
        self.latest_prompt.read().await.clone()
    }

    pub async fn latest_image(&self) -> Option<ImageReference> {
        self.latest_image.read().await.clone()
    }

    /// Replace the published prompt bundle.
    pub async fn publish_prompt(&self, bundle: PromptBundle) {
        *self.latest_prompt.write().await = Some(bundle);
    }

    /// Replace the published image reference.
    pub async fn publish_image(&self, reference: ImageReference) {
        *self.latest_image.write().await = Some(reference);
    }
}
