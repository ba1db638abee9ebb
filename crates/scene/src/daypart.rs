//! Day/night segment classification.
//!
//! The current instant is placed inside either the daylight period
//! `[sunrise, sunset)` or the night that wraps around midnight, and the
//! fractional position within that period selects one of ten labels.
//!
//! Positions are computed on the 24-hour clock. Sunrise and sunset may come
//! from different calendar days (hosts often report the *next* rising and
//! setting), so only their time of day matters.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use weathercanvas_core::error::ObservationError;

const DAY_MS: i64 = 86_400_000;

/// Label used when the period cannot be determined.
pub const FALLBACK_DAY_PART: &str = "unknown time";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Night,
}

impl Period {
    pub fn next(self) -> Self {
        match self {
            Period::Day => Period::Night,
            Period::Night => Period::Day,
        }
    }

    fn table(self) -> &'static [Bucket; 10] {
        match self {
            Period::Day => &DAY_TABLE,
            Period::Night => &NIGHT_TABLE,
        }
    }
}

/// Half-open `[lower, upper)` slice of a period.
struct Bucket {
    lower: f64,
    upper: f64,
    label: &'static str,
}

const fn bucket(lower: f64, upper: f64, label: &'static str) -> Bucket {
    Bucket {
        lower,
        upper,
        label,
    }
}

const DAY_TABLE: [Bucket; 10] = [
    bucket(0.0, 0.1, "sunrise"),
    bucket(0.1, 0.2, "early morning"),
    bucket(0.2, 0.3, "mid-morning"),
    bucket(0.3, 0.4, "late morning"),
    bucket(0.4, 0.5, "noon"),
    bucket(0.5, 0.6, "early afternoon"),
    bucket(0.6, 0.7, "mid-afternoon"),
    bucket(0.7, 0.8, "late afternoon"),
    bucket(0.8, 0.9, "dusk"),
    bucket(0.9, 1.0, "sunset"),
];

const NIGHT_TABLE: [Bucket; 10] = [
    bucket(0.0, 0.1, "twilight"),
    bucket(0.1, 0.2, "early night"),
    bucket(0.2, 0.3, "nightfall"),
    bucket(0.3, 0.4, "midnight hours"),
    bucket(0.4, 0.5, "late night"),
    bucket(0.5, 0.6, "deep night"),
    bucket(0.6, 0.7, "quiet hours"),
    bucket(0.7, 0.8, "pre-dawn"),
    bucket(0.8, 0.9, "dawn's first light"),
    bucket(0.9, 1.0, "dawn"),
];

/// One of the twenty day-part labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayPart {
    pub period: Period,
    /// Bucket index within the period, `0..10`
    pub index: usize,
}

impl DayPart {
    pub fn label(&self) -> &'static str {
        self.period.table()[self.index].label
    }

    /// Select the label for a fractional position within `period`.
    ///
    /// A fraction of exactly `1.0` is the start of the next period.
    pub fn from_fraction(period: Period, fraction: f64) -> Result<Self, ObservationError> {
        if !fraction.is_finite() || fraction < 0.0 {
            return Err(ObservationError::Unavailable(format!(
                "period fraction {fraction} out of range"
            )));
        }
        if fraction == 1.0 {
            return Ok(DayPart {
                period: period.next(),
                index: 0,
            });
        }

        period
            .table()
            .iter()
            .position(|b| b.lower <= fraction && fraction < b.upper)
            .map(|index| DayPart { period, index })
            .ok_or_else(|| {
                ObservationError::Unavailable(format!("period fraction {fraction} out of range"))
            })
    }
}

impl fmt::Display for DayPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn time_of_day_ms(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis().rem_euclid(DAY_MS)
}

/// Classify `now` against the reported sunrise and sunset.
pub fn classify(
    now: DateTime<Utc>,
    sunrise: DateTime<Utc>,
    sunset: DateTime<Utc>,
) -> Result<DayPart, ObservationError> {
    let rise = time_of_day_ms(sunrise);
    let set = time_of_day_ms(sunset);
    let now = time_of_day_ms(now);

    let day_length = (set - rise).rem_euclid(DAY_MS);
    if day_length == 0 {
        return Err(ObservationError::Unavailable(
            "sunrise and sunset coincide".into(),
        ));
    }

    let since_sunrise = (now - rise).rem_euclid(DAY_MS);
    let (period, elapsed, length) = if since_sunrise < day_length {
        (Period::Day, since_sunrise, day_length)
    } else {
        (
            Period::Night,
            (now - set).rem_euclid(DAY_MS),
            DAY_MS - day_length,
        )
    };

    DayPart::from_fraction(period, elapsed as f64 / length as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, h, m, 0).unwrap()
    }

    #[test]
    fn each_bucket_lower_bound_selects_its_label() {
        for period in [Period::Day, Period::Night] {
            for (i, b) in period.table().iter().enumerate() {
                let part = DayPart::from_fraction(period, b.lower).unwrap();
                assert_eq!(part.index, i, "lower bound {} of {period:?}", b.lower);
            }
        }
    }

    #[test]
    fn final_bucket_takes_everything_below_one() {
        let part = DayPart::from_fraction(Period::Day, 0.999_999).unwrap();
        assert_eq!(part.label(), "sunset");
        let part = DayPart::from_fraction(Period::Night, 0.95).unwrap();
        assert_eq!(part.label(), "dawn");
    }

    #[test]
    fn fraction_of_one_starts_next_period() {
        assert_eq!(
            DayPart::from_fraction(Period::Day, 1.0).unwrap().label(),
            "twilight"
        );
        assert_eq!(
            DayPart::from_fraction(Period::Night, 1.0).unwrap().label(),
            "sunrise"
        );
    }

    #[test]
    fn invalid_fractions_are_unavailable() {
        assert!(DayPart::from_fraction(Period::Day, -0.01).is_err());
        assert!(DayPart::from_fraction(Period::Day, f64::NAN).is_err());
        assert!(DayPart::from_fraction(Period::Night, f64::INFINITY).is_err());
        assert!(DayPart::from_fraction(Period::Night, 1.5).is_err());
    }

    #[test]
    fn daytime_positions() {
        let (rise, set) = (at(1, 6, 0), at(1, 18, 0));
        assert_eq!(classify(at(1, 6, 0), rise, set).unwrap().label(), "sunrise");
        assert_eq!(classify(at(1, 11, 0), rise, set).unwrap().label(), "noon");
        assert_eq!(
            classify(at(1, 12, 0), rise, set).unwrap().label(),
            "early afternoon"
        );
        assert_eq!(classify(at(1, 17, 59), rise, set).unwrap().label(), "sunset");
    }

    #[test]
    fn night_wraps_across_midnight() {
        let (rise, set) = (at(1, 6, 0), at(1, 18, 0));
        assert_eq!(classify(at(1, 18, 0), rise, set).unwrap().label(), "twilight");
        assert_eq!(classify(at(2, 0, 0), rise, set).unwrap().label(), "deep night");
        assert_eq!(classify(at(2, 5, 59), rise, set).unwrap().label(), "dawn");
    }

    #[test]
    fn next_rising_on_following_day() {
        let part = classify(at(1, 20, 0), at(2, 6, 0), at(1, 18, 0)).unwrap();
        assert_eq!(part.period, Period::Night);
        assert_eq!(part.label(), "early night");
    }

    #[test]
    fn sunset_earlier_than_sunrise_on_the_clock() {
        // Daylight spanning UTC midnight, as west of Greenwich.
        let part = classify(at(1, 4, 0), at(1, 22, 0), at(1, 10, 0)).unwrap();
        assert_eq!(part.period, Period::Day);
        assert_eq!(part.label(), "early afternoon");
    }

    #[test]
    fn degenerate_sun_times_are_unavailable() {
        let err = classify(at(1, 12, 0), at(1, 6, 0), at(2, 6, 0)).unwrap_err();
        assert!(matches!(err, ObservationError::Unavailable(_)));
    }

    #[test]
    fn every_minute_of_the_day_classifies() {
        let (rise, set) = (at(1, 7, 13), at(1, 16, 47));
        let mut now = at(1, 0, 0);
        for _ in 0..(24 * 60) {
            assert!(classify(now, rise, set).is_ok(), "failed at {now}");
            now += Duration::minutes(1);
        }
    }
}
