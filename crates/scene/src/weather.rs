//! Natural-language weather fragments.

use weathercanvas_core::observation::WeatherReading;

/// Returned when no weather observation is available.
pub const WEATHER_FALLBACK: &str = "Be creative about the weather.";

/// Cloud-coverage reference points and their phrases, ascending.
const CLOUD_PHRASES: [(u8, &str); 11] = [
    (0, "The sky is completely clear."),
    (10, "A few wisps of clouds dot the sky."),
    (20, "Scattered clouds gently float by."),
    (30, "A patchwork of clouds adorns the sky."),
    (40, "Partly cloudy with blue sky peeking through."),
    (50, "A balanced mix of sun and clouds."),
    (60, "More clouds than sun overhead."),
    (70, "The sky is mostly cloudy."),
    (80, "Thick clouds blanket most of the sky."),
    (90, "The sky is grey and heavily clouded."),
    (100, "Clouds completely cover the sky."),
];

/// Nearest reference point to `pct`; equidistant values resolve downward.
pub fn nearest_cloud_point(pct: f64) -> u8 {
    let mut best = CLOUD_PHRASES[0].0;
    let mut best_distance = f64::INFINITY;
    for (point, _) in CLOUD_PHRASES {
        let distance = (pct - f64::from(point)).abs();
        // strict: the lower point wins a tie
        if distance < best_distance {
            best = point;
            best_distance = distance;
        }
    }
    best
}

pub fn cloud_phrase(pct: f64) -> &'static str {
    let point = nearest_cloud_point(pct);
    CLOUD_PHRASES
        .iter()
        .find(|(p, _)| *p == point)
        .map(|(_, phrase)| *phrase)
        .unwrap_or(CLOUD_PHRASES[0].1)
}

/// `It's a <condition> day with a temperature of <t><unit>. <phrase>`
pub fn describe(reading: &WeatherReading) -> String {
    format!(
        "It's a {} day with a temperature of {}{}. {}",
        reading.condition,
        reading.temperature,
        reading.unit.symbol(),
        cloud_phrase(reading.cloud_coverage_pct)
    )
}

/// Describe the reading, or fall back when there is none.
pub fn describe_or_fallback(reading: Option<&WeatherReading>) -> String {
    match reading {
        Some(reading) => describe(reading),
        None => WEATHER_FALLBACK.to_string(),
    }
}
