//! Scene classification and prompt composition for WeatherCanvas.
//!
//! Pure classifiers turn an [`Observation`](weathercanvas_core::Observation)
//! into text fragments; the [`PromptComposer`] assembles them and asks a
//! text generator for the final image prompt.

pub mod composer;
pub mod daypart;
pub mod scene;
pub mod season;
pub mod weather;

pub use composer::PromptComposer;
pub use daypart::{DayPart, FALLBACK_DAY_PART, Period};
pub use scene::{DEFAULT_LOCATION, Scene};
pub use season::Season;
pub use weather::WEATHER_FALLBACK;
