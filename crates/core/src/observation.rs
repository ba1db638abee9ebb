//! Ambient observations — the per-cycle snapshot of time, sun, weather and
//! location that the scene classifiers consume.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ObservationError, ProviderError};

/// Sunrise and sunset instants reported by the observation source.
///
/// The two instants may belong to different calendar days: sources commonly
/// report the *next* rising and setting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SunTimes {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    /// Whether the sun is above the horizon, when the source knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_up: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

/// Current weather conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Free-text condition, e.g. "sunny" or "light rain"
    pub condition: String,
    pub temperature: f64,
    #[serde(default)]
    pub unit: TemperatureUnit,
    /// Cloud coverage in percent (0–100)
    pub cloud_coverage_pct: f64,
}

/// Read-only snapshot consumed by one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub sun: Option<SunTimes>,
    #[serde(default)]
    pub weather: Option<WeatherReading>,
    /// Location reported by the source (the configured name takes precedence)
    #[serde(default)]
    pub location_name: Option<String>,
}

impl Observation {
    /// An observation carrying only the clock.
    pub fn bare(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            sun: None,
            weather: None,
            location_name: None,
        }
    }

    /// The sun times, or `Unavailable` when the source had none.
    pub fn sun_times(&self) -> Result<SunTimes, ObservationError> {
        self.sun
            .ok_or_else(|| ObservationError::Unavailable("sunrise/sunset not reported".into()))
    }
}

/// Source of ambient observations (weather service, host sensors, ...).
#[async_trait]
pub trait ObservationSource: Send + Sync {
    fn name(&self) -> &str;

    async fn observe(&self) -> Result<Observation, ObservationError>;
}

/// Turns the configured coordinates into a human place name.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    fn name(&self) -> &str;

    async fn resolve(&self) -> Result<String, ProviderError>;
}
