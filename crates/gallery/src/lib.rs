//! Image acquisition, storage and retention for WeatherCanvas.
//!
//! - [`ImageAcquirer`] sends a prompt to the image generator, downloads the
//!   result and persists it through the [`ImageStore`].
//! - [`RetentionManager`] keeps the store bounded to the newest N files.
//! - [`ImageViewer`] serves the latest published image to readers.

pub mod acquirer;
pub mod retention;
pub mod store;
pub mod viewer;

pub use acquirer::ImageAcquirer;
pub use retention::RetentionManager;
pub use store::{ImageStore, StoredImage};
pub use viewer::ImageViewer;
