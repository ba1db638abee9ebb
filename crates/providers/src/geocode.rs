//! Reverse geocoding of the configured coordinates into a place name.
//!
//! [`GoogleGeocoder`] asks the Google Geocoding API for the address at the
//! weather coordinates and formats it as `locality, province, region,
//! country`, skipping whatever the address does not carry.
//! [`LocatedSource`] stamps the resolved name onto every observation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use weathercanvas_config::{GeocodingConfig, WeatherConfig};
use weathercanvas_core::error::{ObservationError, ProviderError};
use weathercanvas_core::observation::{LocationResolver, Observation, ObservationSource};

pub struct GoogleGeocoder {
    base_url: String,
    api_key: String,
    latitude: f64,
    longitude: f64,
    client: reqwest::Client,
}

impl GoogleGeocoder {
    /// Coordinates come from the weather section.
    pub fn from_config(
        config: &GeocodingConfig,
        weather: &WeatherConfig,
    ) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ProviderError::NotConfigured("geocoding.api_key (or GOOGLEMAPS_API_KEY)".into())
            })?;
        let (Some(latitude), Some(longitude)) = (weather.latitude, weather.longitude) else {
            return Err(ProviderError::NotConfigured(
                "weather.latitude / weather.longitude".into(),
            ));
        };

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
            latitude,
            longitude,
            client: crate::http_client()?,
        })
    }
}

#[async_trait]
impl LocationResolver for GoogleGeocoder {
    fn name(&self) -> &str {
        "google-geocoding"
    }

    async fn resolve(&self) -> Result<String, ProviderError> {
        let url = format!("{}/json", self.base_url);
        debug!(lat = self.latitude, lon = self.longitude, "Reverse geocoding");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latlng", format!("{},{}", self.latitude, self.longitude)),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if status != 200 {
            warn!(status, body = %body, "Geocoding service returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: body,
            });
        }

        parse_reverse_geocode(&body)
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

/// One component of a geocoded address.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

/// `locality, province, region, country`, skipping missing parts.
///
/// A component is classified by its first matching type in that order; the
/// last component of a kind wins. Returns `None` when no part is present.
pub fn format_location_name(components: &[AddressComponent]) -> Option<String> {
    const KINDS: [&str; 4] = [
        "locality",
        "administrative_area_level_2",
        "administrative_area_level_1",
        "country",
    ];

    let mut parts: [Option<&str>; 4] = [None; 4];
    for component in components {
        let slot = KINDS
            .iter()
            .position(|kind| component.types.iter().any(|t| t == kind));
        if let Some(slot) = slot {
            parts[slot] = Some(component.long_name.as_str());
        }
    }

    let name = parts
        .iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ");

    (!name.is_empty()).then_some(name)
}

/// Extract the formatted place name from a reverse-geocoding response.
pub fn parse_reverse_geocode(body: &str) -> Result<String, ProviderError> {
    let parsed: GeocodeResponse = serde_json::from_str(body).map_err(|e| ProviderError::ApiError {
        status_code: 200,
        message: format!("Failed to parse geocoding response: {e}"),
    })?;

    match parsed.status.as_str() {
        "OK" => {}
        "REQUEST_DENIED" => {
            return Err(ProviderError::AuthenticationFailed(
                parsed
                    .error_message
                    .unwrap_or_else(|| "geocoding request denied".into()),
            ));
        }
        other => {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: format!(
                    "geocoding status {other}{}",
                    parsed
                        .error_message
                        .map(|m| format!(": {m}"))
                        .unwrap_or_default()
                ),
            });
        }
    }

    let first = parsed
        .results
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::ApiError {
            status_code: 200,
            message: "geocoding returned no results".into(),
        })?;

    format_location_name(&first.address_components).ok_or_else(|| ProviderError::ApiError {
        status_code: 200,
        message: "geocoded address has no locality, province, region or country".into(),
    })
}

/// Observation source decorated with a resolved place name.
///
/// A successful resolution is kept for the life of the process; a failure
/// leaves the observation untouched and is retried on the next call.
pub struct LocatedSource {
    inner: Arc<dyn ObservationSource>,
    resolver: Arc<dyn LocationResolver>,
    resolved: OnceCell<String>,
}

impl LocatedSource {
    pub fn new(inner: Arc<dyn ObservationSource>, resolver: Arc<dyn LocationResolver>) -> Self {
        Self {
            inner,
            resolver,
            resolved: OnceCell::new(),
        }
    }

    async fn location(&self) -> Option<String> {
        let resolved = self
            .resolved
            .get_or_try_init(|| async {
                let name = self.resolver.resolve().await?;
                info!(resolver = self.resolver.name(), location = %name, "Location resolved");
                Ok::<_, ProviderError>(name)
            })
            .await;

        match resolved {
            Ok(name) => Some(name.clone()),
            Err(e) => {
                warn!(resolver = self.resolver.name(), error = %e, "Location lookup failed");
                None
            }
        }
    }
}

#[async_trait]
impl ObservationSource for LocatedSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn observe(&self) -> Result<Observation, ObservationError> {
        let mut observation = self.inner.observe().await?;
        if let Some(name) = self.location().await {
            observation.location_name = Some(name);
        }
        Ok(observation)
    }
}
