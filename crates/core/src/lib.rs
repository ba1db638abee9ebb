//! # WeatherCanvas Core
//!
//! Domain types, traits, and error definitions for the WeatherCanvas
//! scene-to-image pipeline. This crate has **no HTTP or filesystem
//! dependencies**: it defines the model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (text generation, image generation, image
//! download, weather observation) is a trait here. Implementations live in
//! `weathercanvas-providers`. This enables:
//! - Swapping backends via configuration
//! - Scripted test doubles for the whole pipeline
//! - A clean dependency graph (all crates depend inward on core)

pub mod artifact;
pub mod error;
pub mod event;
pub mod image;
pub mod message;
pub mod observation;
pub mod provider;
pub mod state;

// Re-export key types at crate root for ergonomics
pub use artifact::{GeneratedImage, ImageReference, PromptBundle};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus, Subscription};
pub use image::{ImageFetcher, ImageGenerator, ImageModel, ImageOptions, ImageRequest};
pub use message::{Message, Role};
pub use observation::{
    LocationResolver, Observation, ObservationSource, SunTimes, TemperatureUnit, WeatherReading,
};
pub use provider::{ProviderRequest, ProviderResponse, TextGenerator};
pub use state::CanvasState;
