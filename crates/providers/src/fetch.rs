//! Downloads generated image bytes over HTTP.

use async_trait::async_trait;
use tracing::{debug, warn};
use weathercanvas_core::error::{AcquisitionError, ProviderError};
use weathercanvas_core::image::ImageFetcher;

/// Plain HTTP GET fetcher for generated image URLs.
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: crate::http_client()?,
        })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AcquisitionError> {
        debug!(url, "Downloading generated image");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AcquisitionError::Download(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), url, "Image download rejected");
            return Err(AcquisitionError::Download(format!(
                "status {} while fetching {url}",
                status.as_u16()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AcquisitionError::Download(format!("body read failed: {e}")))?;

        Ok(bytes.to_vec())
    }
}
