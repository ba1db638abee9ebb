//! OpenWeatherMap "current weather" observation source.
//!
//! Reads `dt`, `sys.sunrise`, `sys.sunset`, `weather[0].description`,
//! `main.temp`, `clouds.all` and `name` from the response. Missing weather
//! fields degrade to `None` so the scene falls back per field; only an
//! unusable response fails the whole observation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};
use weathercanvas_config::WeatherConfig;
use weathercanvas_core::error::{ObservationError, ProviderError};
use weathercanvas_core::observation::*;

pub struct OpenWeatherSource {
    base_url: String,
    api_key: String,
    latitude: f64,
    longitude: f64,
    units: String,
    language: String,
    client: reqwest::Client,
}

impl OpenWeatherSource {
    pub fn from_config(config: &WeatherConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ProviderError::NotConfigured("weather.api_key (or OPENWEATHERMAP_API_KEY)".into())
        })?;
        let (Some(latitude), Some(longitude)) = (config.latitude, config.longitude) else {
            return Err(ProviderError::NotConfigured(
                "weather.latitude / weather.longitude".into(),
            ));
        };

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
            latitude,
            longitude,
            units: config.units.clone(),
            language: config.language.clone(),
            client: crate::http_client()?,
        })
    }

    fn unit(&self) -> TemperatureUnit {
        unit_for(&self.units)
    }
}

fn unit_for(units: &str) -> TemperatureUnit {
    match units {
        "imperial" => TemperatureUnit::Fahrenheit,
        _ => TemperatureUnit::Celsius,
    }
}

#[async_trait]
impl ObservationSource for OpenWeatherSource {
    fn name(&self) -> &str {
        "openweathermap"
    }

    async fn observe(&self) -> Result<Observation, ObservationError> {
        let url = format!("{}/weather", self.base_url);
        debug!(lat = self.latitude, lon = self.longitude, "Fetching current weather");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", self.latitude.to_string()),
                ("lon", self.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", self.units.clone()),
                ("lang", self.language.clone()),
            ])
            .send()
            .await
            .map_err(|e| ObservationError::Unavailable(format!("weather request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ObservationError::Unavailable(format!("weather body unreadable: {e}")))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Weather service returned error");
            return Err(ObservationError::Unavailable(format!(
                "weather service status {}",
                status.as_u16()
            )));
        }

        parse_current(&body, self.unit())
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    dt: Option<i64>,
    #[serde(default)]
    sys: Option<SysBlock>,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
    #[serde(default)]
    main: Option<MainBlock>,
    #[serde(default)]
    clouds: Option<CloudsBlock>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SysBlock {
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CloudsBlock {
    all: Option<f64>,
}

fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Turn a current-weather response body into an observation.
pub fn parse_current(body: &str, unit: TemperatureUnit) -> Result<Observation, ObservationError> {
    let current: CurrentWeather = serde_json::from_str(body)
        .map_err(|e| ObservationError::Unavailable(format!("weather response invalid: {e}")))?;

    let timestamp = current.dt.and_then(from_unix).unwrap_or_else(Utc::now);

    let sun = current.sys.and_then(|sys| {
        let sunrise = from_unix(sys.sunrise?)?;
        let sunset = from_unix(sys.sunset?)?;
        Some(SunTimes {
            sunrise,
            sunset,
            is_up: Some(sunrise <= timestamp && timestamp < sunset),
        })
    });

    let condition = current
        .weather
        .into_iter()
        .next()
        .and_then(|w| w.description)
        .filter(|d| !d.trim().is_empty());
    let temperature = current.main.and_then(|m| m.temp);
    let clouds = current.clouds.and_then(|c| c.all);

    let weather = match (condition, temperature, clouds) {
        (Some(condition), Some(temperature), Some(cloud_coverage_pct)) => Some(WeatherReading {
            condition,
            temperature,
            unit,
            cloud_coverage_pct,
        }),
        _ => None,
    };

    Ok(Observation {
        timestamp,
        sun,
        weather,
        location_name: current.name.filter(|n| !n.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MALAGA: &str = r#"{
        "coord": {"lon": -4.5864, "lat": 36.6402},
        "weather": [{"id": 802, "main": "Clouds", "description": "scattered clouds", "icon": "03d"}],
        "main": {"temp": 18.4, "feels_like": 17.9, "humidity": 60},
        "clouds": {"all": 45},
        "dt": 1700049600,
        "sys": {"country": "ES", "sunrise": 1700031600, "sunset": 1700068800},
        "name": "Alhaurín de la Torre"
    }"#;

    #[test]
    fn parses_complete_response() {
        let obs = parse_current(MALAGA, TemperatureUnit::Celsius).unwrap();
        let sun = obs.sun.unwrap();
        assert_eq!(sun.sunrise.timestamp(), 1_700_031_600);
        assert_eq!(sun.sunset.timestamp(), 1_700_068_800);
        assert_eq!(sun.is_up, Some(true));
        assert_eq!(obs.timestamp.timestamp(), 1_700_049_600);

        let weather = obs.weather.unwrap();
        assert_eq!(weather.condition, "scattered clouds");
        assert_eq!(weather.temperature, 18.4);
        assert_eq!(weather.cloud_coverage_pct, 45.0);
        assert_eq!(obs.location_name.as_deref(), Some("Alhaurín de la Torre"));
    }

    #[test]
    fn missing_fields_degrade_to_none() {
        let obs = parse_current(r#"{"dt": 1700049600, "weather": []}"#, TemperatureUnit::Celsius)
            .unwrap();
        assert!(obs.sun.is_none());
        assert!(obs.weather.is_none());
        assert!(obs.location_name.is_none());
    }

    #[test]
    fn invalid_body_is_unavailable() {
        let err = parse_current("<html>502</html>", TemperatureUnit::Celsius).unwrap_err();
        assert!(matches!(err, ObservationError::Unavailable(_)));
    }

    #[test]
    fn imperial_units_report_fahrenheit() {
        assert_eq!(unit_for("imperial"), TemperatureUnit::Fahrenheit);
        assert_eq!(unit_for("metric"), TemperatureUnit::Celsius);
    }

    #[test]
    fn source_requires_credentials_and_coordinates() {
        let mut config = WeatherConfig::default();
        assert!(OpenWeatherSource::from_config(&config).is_err());

        config.api_key = Some("owm-key".into());
        assert!(OpenWeatherSource::from_config(&config).is_err());

        config.latitude = Some(59.91);
        config.longitude = Some(10.75);
        let source = OpenWeatherSource::from_config(&config).unwrap();
        assert_eq!(source.name(), "openweathermap");
    }
}
