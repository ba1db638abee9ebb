//! Builds the external service clients from configuration.

use std::sync::Arc;

use tracing::info;
use weathercanvas_config::{AppConfig, WeatherSourceKind};
use weathercanvas_core::error::ProviderError;
use weathercanvas_core::image::{ImageFetcher, ImageGenerator};
use weathercanvas_core::observation::ObservationSource;
use weathercanvas_core::provider::TextGenerator;

use crate::clock::ClockSource;
use crate::fetch::HttpImageFetcher;
use crate::geocode::{GoogleGeocoder, LocatedSource};
use crate::openai_compat::OpenAiCompatProvider;
use crate::openweather::OpenWeatherSource;

/// Every external collaborator a cycle talks to.
#[derive(Clone)]
pub struct Services {
    pub text: Arc<dyn TextGenerator>,
    pub images: Arc<dyn ImageGenerator>,
    pub fetcher: Arc<dyn ImageFetcher>,
    pub observations: Arc<dyn ObservationSource>,
}

/// Build service clients from configuration.
///
/// Fails with `NotConfigured` when a required credential is absent.
pub fn build_from_config(config: &AppConfig) -> Result<Services, ProviderError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        ProviderError::NotConfigured("api_key (or WEATHERCANVAS_API_KEY / OPENAI_API_KEY)".into())
    })?;

    let text = Arc::new(OpenAiCompatProvider::new("openai", &config.api_url, api_key)?);

    let images: Arc<dyn ImageGenerator> = match config.image.api_key.as_deref() {
        Some(image_key) => Arc::new(OpenAiCompatProvider::new(
            "openai-images",
            &config.api_url,
            image_key,
        )?),
        None => text.clone(),
    };

    let observations: Arc<dyn ObservationSource> = match config.weather.source {
        WeatherSourceKind::None => Arc::new(ClockSource),
        WeatherSourceKind::OpenWeatherMap => {
            Arc::new(OpenWeatherSource::from_config(&config.weather)?)
        }
    };

    let observations: Arc<dyn ObservationSource> = if config.geocoding.enabled() {
        let geocoder = GoogleGeocoder::from_config(&config.geocoding, &config.weather)?;
        Arc::new(LocatedSource::new(observations, Arc::new(geocoder)))
    } else {
        observations
    };

    info!(
        text_model = %config.text_model,
        image_model = %config.image.model,
        observations = observations.name(),
        "Service clients ready"
    );

    Ok(Services {
        text,
        images,
        fetcher: Arc::new(HttpImageFetcher::new()?),
        observations,
    })
}
