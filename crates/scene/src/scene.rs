//! Scene assembly from one observation snapshot.

use serde::Serialize;
use tracing::warn;
use weathercanvas_core::observation::Observation;

use crate::daypart::{self, FALLBACK_DAY_PART};
use crate::season::Season;
use crate::weather;

pub const DEFAULT_LOCATION: &str = "Unknown Location";

/// The fragments a prompt is composed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub day_part: String,
    pub season: Season,
    pub location: String,
    pub weather: String,
}

impl Scene {
    /// Classify an observation. Unavailable parts degrade to fallbacks.
    ///
    /// The configured location wins over the one reported by the source.
    pub fn from_observation(observation: &Observation, configured_location: Option<&str>) -> Self {
        let day_part = match observation.sun_times().and_then(|sun| {
            daypart::classify(observation.timestamp, sun.sunrise, sun.sunset)
        }) {
            Ok(part) => part.label().to_string(),
            Err(e) => {
                warn!(error = %e, "Day part unavailable, using fallback");
                FALLBACK_DAY_PART.to_string()
            }
        };

        if observation.weather.is_none() {
            warn!("Weather data unavailable, using fallback");
        }

        let location = configured_location
            .or(observation.location_name.as_deref())
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LOCATION)
            .to_string();

        Self {
            day_part,
            season: Season::of(observation.timestamp),
            location,
            weather: weather::describe_or_fallback(observation.weather.as_ref()),
        }
    }

    /// `In <location>, it is <day_part> in <season>. <weather>`
    pub fn composed_input(&self) -> String {
        format!(
            "In {}, it is {} in {}. {}",
            self.location, self.day_part, self.season, self.weather
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use weathercanvas_core::observation::{SunTimes, TemperatureUnit, WeatherReading};

    fn full_observation() -> Observation {
        Observation {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap(),
            sun: Some(SunTimes {
                sunrise: Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap(),
                sunset: Utc.with_ymd_and_hms(2024, 1, 15, 18, 0, 0).unwrap(),
                is_up: Some(true),
            }),
            weather: Some(WeatherReading {
                condition: "snowy".into(),
                temperature: -3.0,
                unit: TemperatureUnit::Celsius,
                cloud_coverage_pct: 100.0,
            }),
            location_name: Some("Tromsø".into()),
        }
    }

    #[test]
    fn composes_full_scene() {
        let scene = Scene::from_observation(&full_observation(), None);
        assert_eq!(
            scene.composed_input(),
            "In Tromsø, it is noon in Winter. It's a snowy day with a temperature of -3°C. \
             Clouds completely cover the sky."
        );
    }

    #[test]
    fn configured_location_takes_precedence() {
        let scene = Scene::from_observation(&full_observation(), Some("Oslo, Norway"));
        assert_eq!(scene.location, "Oslo, Norway");
    }

    #[test]
    fn bare_observation_uses_fallbacks() {
        let obs = Observation::bare(Utc.with_ymd_and_hms(2024, 4, 2, 3, 0, 0).unwrap());
        let scene = Scene::from_observation(&obs, None);
        assert_eq!(scene.day_part, FALLBACK_DAY_PART);
        assert_eq!(scene.season, Season::Spring);
        assert_eq!(scene.location, DEFAULT_LOCATION);
        assert_eq!(scene.weather, weather::WEATHER_FALLBACK);
    }

    #[test]
    fn degenerate_sun_times_fall_back() {
        let mut obs = full_observation();
        if let Some(sun) = obs.sun.as_mut() {
            sun.sunset = sun.sunrise;
        }
        let scene = Scene::from_observation(&obs, None);
        assert_eq!(scene.day_part, FALLBACK_DAY_PART);
    }
}
