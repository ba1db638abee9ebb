//! Clock-only observation source.

use async_trait::async_trait;
use chrono::Utc;
use weathercanvas_core::error::ObservationError;
use weathercanvas_core::observation::{Observation, ObservationSource};

/// Reports the current instant and nothing else.
///
/// Used when no weather service is configured. Day part and weather fall
/// back to their generic phrases; the season still resolves from the date.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClockSource;

#[async_trait]
impl ObservationSource for ClockSource {
    fn name(&self) -> &str {
        "clock"
    }

    async fn observe(&self) -> Result<Observation, ObservationError> {
        Ok(Observation::bare(Utc::now()))
    }
}
