//! External service clients for WeatherCanvas.
//!
//! The text and image generators speak the OpenAI-compatible REST surface.
//! Observations come from OpenWeatherMap or, without one, from the clock.
//! Google reverse geocoding optionally names the place.

pub mod clock;
pub mod fetch;
pub mod geocode;
pub mod openai_compat;
pub mod openweather;
pub mod services;

pub use clock::ClockSource;
pub use fetch::HttpImageFetcher;
pub use geocode::{GoogleGeocoder, LocatedSource};
pub use openai_compat::OpenAiCompatProvider;
pub use openweather::OpenWeatherSource;
pub use services::{Services, build_from_config};

use std::time::Duration;
use weathercanvas_core::error::ProviderError;

/// Shared HTTP client settings for every outbound call.
pub(crate) fn http_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .map_err(|e| ProviderError::Network(format!("failed to build HTTP client: {e}")))
}
