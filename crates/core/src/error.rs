//! Error types for the WeatherCanvas domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each pipeline stage has its own error enum; all of them convert into the
//! top-level [`Error`].

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all WeatherCanvas operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Observation errors ---
    #[error("Observation error: {0}")]
    Observation(#[from] ObservationError),

    // --- Prompt synthesis errors ---
    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    // --- Image acquisition errors ---
    #[error("Acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),

    // --- Image storage errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Provider transport errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Stage errors ---

/// Sun or weather data could not be obtained or is unusable.
///
/// Never fatal: classifiers and describers degrade to fallback values.
#[derive(Debug, Clone, Error)]
pub enum ObservationError {
    #[error("Observation unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Error)]
pub enum PromptError {
    #[error("Composed scene input is empty")]
    EmptyInput,

    #[error("Prompt generation failed: {0}")]
    Generation(#[source] ProviderError),
}

#[derive(Debug, Clone, Error)]
pub enum AcquisitionError {
    #[error("Image generation failed: {0}")]
    Generation(String),

    #[error("Malformed image generation response: {0}")]
    MalformedResponse(String),

    #[error("Image download failed: {0}")]
    Download(String),

    #[error("Image persistence failed: {0}")]
    Persistence(String),
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Failed to list image directory {path}: {reason}")]
    ListFailed { path: PathBuf, reason: String },

    #[error("Failed to read image {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("Invalid image file name: {0}")]
    InvalidName(String),
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider returned no choices")]
    EmptyChoices,

    #[error("Provider returned an empty message")]
    EmptyContent,

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}
