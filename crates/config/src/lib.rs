//! Configuration loading, validation, and management for WeatherCanvas.
//!
//! Loads configuration from `~/.weathercanvas/config.toml` with environment
//! variable overrides. Validates all settings at startup. The pipeline treats
//! the loaded configuration as read-only; changing it means restarting.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use weathercanvas_core::image::{ImageModel, ImageOptions};

/// The root configuration structure.
///
/// Maps directly to `~/.weathercanvas/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Credential for the text- and image-generation service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Chat model used to refine the scene into an image prompt
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Operator instruction describing the target prompt style and length
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,

    /// Place name woven into the scene; falls back to the observation source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,

    /// How overlapping cycles are admitted
    #[serde(default)]
    pub admission: AdmissionPolicy,

    /// Image generation options
    #[serde(default)]
    pub image: ImageConfig,

    /// Where images are stored and how they are exposed
    #[serde(default)]
    pub storage: StorageConfig,

    /// Weather observation source
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Reverse geocoding of the weather coordinates into a place name
    #[serde(default)]
    pub geocoding: GeocodingConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Periodic triggers
    #[serde(default = "default_schedules")]
    pub schedules: Vec<ScheduleConfig>,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_text_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_system_instruction() -> String {
    "Create a succinct DALL-E prompt under 100 words, that will create an artistic image, \
     focusing on the most visually striking aspects of the given city/region, weather, and \
     time of day. Highlight key elements that define the scene's character, such as specific \
     landmarks, weather effects, folklore or cultural features, in a direct and vivid manner. \
     Avoid elaborate descriptions; instead, aim for a prompt that vividly captures the essence \
     of the scene in a concise format, suitable for generating a distinct and compelling image."
        .into()
}
fn default_true() -> bool {
    true
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("text_model", &self.text_model)
            .field("system_instruction", &self.system_instruction)
            .field("location_name", &self.location_name)
            .field("admission", &self.admission)
            .field("image", &self.image)
            .field("storage", &self.storage)
            .field("weather", &self.weather)
            .field("geocoding", &self.geocoding)
            .field("gateway", &self.gateway)
            .field("schedules", &self.schedules)
            .finish()
    }
}

/// Admission policy for overlapping cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPolicy {
    /// Every trigger runs immediately, cycles may interleave
    #[default]
    Concurrent,
    /// At most one cycle executes at a time; later triggers wait their turn
    Exclusive,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default)]
    pub model: ImageModel,

    #[serde(default = "default_image_size")]
    pub size: String,

    /// Only sent for models using the extended request shape
    #[serde(default = "default_image_quality")]
    pub quality: String,

    /// Only sent for models using the extended request shape
    #[serde(default = "default_image_style")]
    pub style: String,

    /// Separate credential for image generation (defaults to `api_key`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_image_size() -> String {
    "1024x1024".into()
}
fn default_image_quality() -> String {
    "standard".into()
}
fn default_image_style() -> String {
    "vivid".into()
}

impl ImageConfig {
    pub fn options(&self) -> ImageOptions {
        ImageOptions {
            model: self.model,
            size: self.size.clone(),
            quality: self.quality.clone(),
            style: self.style.clone(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            model: ImageModel::default(),
            size: default_image_size(),
            quality: default_image_quality(),
            style: default_image_style(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for ImageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageConfig")
            .field("model", &self.model)
            .field("size", &self.size)
            .field("quality", &self.quality)
            .field("style", &self.style)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Public asset directory (default: `~/.weathercanvas/www`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    #[serde(default = "default_max_images_retained")]
    pub max_images_retained: usize,

    /// Base URL under which `/local/<file>` is reachable
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_file_prefix() -> String {
    "dalle".into()
}
fn default_max_images_retained() -> usize {
    5
}
fn default_public_base_url() -> String {
    format!("http://{}:{}", default_host(), default_port())
}

impl StorageConfig {
    /// The configured directory, or the default under the config dir.
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("www"))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_prefix: default_file_prefix(),
            max_images_retained: default_max_images_retained(),
            public_base_url: default_public_base_url(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherSourceKind {
    /// Clock only: day-part and weather degrade to fallbacks
    #[default]
    None,
    OpenWeatherMap,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default)]
    pub source: WeatherSourceKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_weather_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    /// "metric" or "imperial"
    #[serde(default = "default_units")]
    pub units: String,

    #[serde(default = "default_language")]
    pub language: String,
}

fn default_weather_url() -> String {
    "https://api.openweathermap.org/data/2.5".into()
}
fn default_units() -> String {
    "metric".into()
}
fn default_language() -> String {
    "en".into()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            source: WeatherSourceKind::default(),
            api_key: None,
            api_url: default_weather_url(),
            latitude: None,
            longitude: None,
            units: default_units(),
            language: default_language(),
        }
    }
}

impl std::fmt::Debug for WeatherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherConfig")
            .field("source", &self.source)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("latitude", &self.latitude)
            .field("longitude", &self.longitude)
            .field("units", &self.units)
            .field("language", &self.language)
            .finish()
    }
}

/// Google Geocoding settings. Disabled unless an API key is present.
#[derive(Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_geocoding_url")]
    pub api_url: String,
}

fn default_geocoding_url() -> String {
    "https://maps.googleapis.com/maps/api/geocode".into()
}

impl GeocodingConfig {
    pub fn enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_geocoding_url(),
        }
    }
}

impl std::fmt::Debug for GeocodingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeocodingConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// A periodic trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Unique name for this schedule
    pub name: String,

    /// Cron expression (5-field: minute hour dom month dow)
    pub cron: String,

    /// What the trigger runs
    #[serde(default)]
    pub action: ScheduleAction,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleAction {
    /// Compose, generate, store and evict
    #[default]
    Cycle,
    /// Only refresh the prompt bundle
    Prompt,
}

fn default_schedules() -> Vec<ScheduleConfig> {
    vec![ScheduleConfig {
        name: "hourly".into(),
        cron: "0 * * * *".into(),
        action: ScheduleAction::Cycle,
        enabled: true,
    }]
}

impl AppConfig {
    /// Load configuration from the default path (~/.weathercanvas/config.toml).
    ///
    /// Also checks environment variables:
    /// - `WEATHERCANVAS_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `WEATHERCANVAS_TEXT_MODEL`
    /// - `WEATHERCANVAS_LOCATION`
    /// - `OPENWEATHERMAP_API_KEY`
    /// - `GOOGLEMAPS_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("WEATHERCANVAS_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("WEATHERCANVAS_TEXT_MODEL") {
            config.text_model = model;
        }

        if let Ok(location) = std::env::var("WEATHERCANVAS_LOCATION") {
            config.location_name = Some(location);
        }

        if config.weather.api_key.is_none() {
            config.weather.api_key = std::env::var("OPENWEATHERMAP_API_KEY").ok();
        }

        if config.geocoding.api_key.is_none() {
            config.geocoding.api_key = std::env::var("GOOGLEMAPS_API_KEY").ok();
        }

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to a specific file path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".weathercanvas")
    }

    /// Credential used for image generation.
    pub fn image_api_key(&self) -> Option<&str> {
        self.image
            .api_key
            .as_deref()
            .or(self.api_key.as_deref())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.max_images_retained == 0 {
            return Err(ConfigError::ValidationError(
                "storage.max_images_retained must be at least 1".into(),
            ));
        }

        if !is_valid_size(&self.image.size) {
            return Err(ConfigError::ValidationError(format!(
                "image.size must look like WIDTHxHEIGHT, got '{}'",
                self.image.size
            )));
        }

        if self.storage.file_prefix.is_empty()
            || self.storage.file_prefix.contains(['/', '\\', '.'])
        {
            return Err(ConfigError::ValidationError(
                "storage.file_prefix must be a plain, non-empty name".into(),
            ));
        }

        if self.weather.source == WeatherSourceKind::OpenWeatherMap
            && (self.weather.latitude.is_none() || self.weather.longitude.is_none())
        {
            return Err(ConfigError::ValidationError(
                "weather.latitude and weather.longitude are required for openweathermap".into(),
            ));
        }

        if self.geocoding.enabled()
            && (self.weather.latitude.is_none() || self.weather.longitude.is_none())
        {
            return Err(ConfigError::ValidationError(
                "weather.latitude and weather.longitude are required for geocoding".into(),
            ));
        }

        let mut names: Vec<&str> = self.schedules.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        if names.windows(2).any(|w| w[0] == w[1]) {
            return Err(ConfigError::ValidationError(
                "schedule names must be unique".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn is_valid_size(size: &str) -> bool {
    match size.split_once('x') {
        Some((w, h)) => {
            !w.is_empty()
                && !h.is_empty()
                && w.chars().all(|c| c.is_ascii_digit())
                && h.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            text_model: default_text_model(),
            system_instruction: default_system_instruction(),
            location_name: None,
            admission: AdmissionPolicy::default(),
            image: ImageConfig::default(),
            storage: StorageConfig::default(),
            weather: WeatherConfig::default(),
            geocoding: GeocodingConfig::default(),
            gateway: GatewayConfig::default(),
            schedules: default_schedules(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to write config file at {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.text_model, "gpt-3.5-turbo");
        assert_eq!(config.storage.max_images_retained, 5);
        assert_eq!(config.image.model, ImageModel::DallE2);
        assert_eq!(config.admission, AdmissionPolicy::Concurrent);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.text_model, config.text_model);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.schedules.len(), 1);
    }

    #[test]
    fn zero_retention_rejected() {
        let mut config = AppConfig::default();
        config.storage.max_images_retained = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_size_rejected() {
        let mut config = AppConfig::default();
        config.image.size = "large".into();
        assert!(config.validate().is_err());
        config.image.size = "512x512".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn openweathermap_requires_coordinates() {
        let mut config = AppConfig::default();
        config.weather.source = WeatherSourceKind::OpenWeatherMap;
        assert!(config.validate().is_err());

        config.weather.latitude = Some(36.64);
        config.weather.longitude = Some(-4.59);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn geocoding_requires_coordinates() {
        let mut config = AppConfig::default();
        assert!(!config.geocoding.enabled());
        config.geocoding.api_key = Some("maps-key".into());
        assert!(config.geocoding.enabled());
        assert!(config.validate().is_err());

        config.weather.latitude = Some(36.64);
        config.weather.longitude = Some(-4.59);
        assert!(config.validate().is_ok());

        let debug = format!("{config:?}");
        assert!(!debug.contains("maps-key"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.api_url, "https://api.openai.com/v1");
    }

    #[test]
    fn parses_full_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
api_key = "sk-test"
text_model = "gpt-4"
location_name = "Málaga, Andalusia, Spain"
admission = "exclusive"

[image]
model = "dall-e-3"
size = "1792x1024"

[storage]
directory = "/srv/canvas"
max_images_retained = 3

[weather]
source = "openweathermap"
latitude = 36.6402359
longitude = -4.5864382

[[schedules]]
name = "morning"
cron = "0 7 * * *"

[[schedules]]
name = "prompt_refresh"
cron = "*/30 * * * *"
action = "prompt"
enabled = false
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.text_model, "gpt-4");
        assert_eq!(config.admission, AdmissionPolicy::Exclusive);
        assert_eq!(config.image.model, ImageModel::DallE3);
        assert_eq!(config.storage.max_images_retained, 3);
        assert_eq!(config.storage.resolved_directory(), PathBuf::from("/srv/canvas"));
        assert_eq!(config.weather.source, WeatherSourceKind::OpenWeatherMap);
        assert_eq!(config.schedules.len(), 2);
        assert_eq!(config.schedules[1].action, ScheduleAction::Prompt);
        assert!(!config.schedules[1].enabled);
        assert_eq!(config.image_api_key(), Some("sk-test"));
    }

    #[test]
    fn duplicate_schedule_names_rejected() {
        let mut config = AppConfig::default();
        config.schedules.push(config.schedules[0].clone());
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = AppConfig {
            api_key: Some("sk-very-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = AppConfig {
            location_name: Some("Oslo".into()),
            ..AppConfig::default()
        };
        config.save_to(&path).unwrap();
        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.location_name.as_deref(), Some("Oslo"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-3.5-turbo"));
        assert!(toml_str.contains("hourly"));
    }
}
