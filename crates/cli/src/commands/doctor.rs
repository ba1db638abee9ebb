//! `weathercanvas doctor` — diagnose configuration and connectivity.

use weathercanvas_config::{AppConfig, ConfigError, WeatherSourceKind};
use weathercanvas_core::observation::{LocationResolver, ObservationSource};
use weathercanvas_providers::{GoogleGeocoder, OpenAiCompatProvider, OpenWeatherSource};
use weathercanvas_core::provider::TextGenerator;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 WeatherCanvas Doctor — Diagnostics");
    println!("=====================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file — defaults in use (run `weathercanvas init`)");
        issues += 1;
    }

    let config = require_valid(AppConfig::load())?;

    match config.api_key.as_deref() {
        Some(key) => match OpenAiCompatProvider::new("openai", &config.api_url, key) {
            Ok(provider) => match provider.health_check().await {
                Ok(true) => println!("  ✅ API key accepted by {}", config.api_url),
                Ok(false) => {
                    println!("  ❌ API key rejected by {}", config.api_url);
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Could not reach {}: {e}", config.api_url);
                    issues += 1;
                }
            },
            Err(e) => {
                println!("  ❌ HTTP client setup failed: {e}");
                issues += 1;
            }
        },
        None => {
            println!("  ❌ No API key — set api_key or export OPENAI_API_KEY");
            issues += 1;
        }
    }

    let images_dir = config.storage.resolved_directory();
    match std::fs::create_dir_all(&images_dir) {
        Ok(()) => println!("  ✅ Image directory usable: {}", images_dir.display()),
        Err(e) => {
            println!("  ❌ Image directory {}: {e}", images_dir.display());
            issues += 1;
        }
    }

    match config.weather.source {
        WeatherSourceKind::None => {
            println!("  ℹ️  No weather source; prompts use time of day and season only");
        }
        WeatherSourceKind::OpenWeatherMap => {
            match OpenWeatherSource::from_config(&config.weather) {
                Ok(source) => match source.observe().await {
                    Ok(observation) if observation.weather.is_some() => {
                        println!("  ✅ Weather observation received");
                    }
                    Ok(_) => {
                        println!("  ⚠️  Weather response was missing conditions");
                        issues += 1;
                    }
                    Err(e) => {
                        println!("  ❌ Weather source failed: {e}");
                        issues += 1;
                    }
                },
                Err(e) => {
                    println!("  ❌ Weather source not configured: {e}");
                    issues += 1;
                }
            }
        }
    }

    if config.geocoding.enabled() {
        match GoogleGeocoder::from_config(&config.geocoding, &config.weather) {
            Ok(geocoder) => match geocoder.resolve().await {
                Ok(name) => println!("  ✅ Location resolved: {name}"),
                Err(e) => {
                    println!("  ❌ Geocoding failed: {e}");
                    issues += 1;
                }
            },
            Err(e) => {
                println!("  ❌ Geocoding not configured: {e}");
                issues += 1;
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// An unloadable config is fatal: there is nothing further to diagnose.
fn require_valid(
    loaded: Result<AppConfig, ConfigError>,
) -> Result<AppConfig, Box<dyn std::error::Error>> {
    match loaded {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            Ok(config)
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            Err(format!("configuration invalid: {e}").into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_is_an_error() {
        let loaded = Err(ConfigError::ValidationError("retention must be at least 1".into()));
        let err = require_valid(loaded).unwrap_err();
        assert!(err.to_string().contains("retention must be at least 1"));
    }

    #[test]
    fn valid_config_passes_through() {
        let config = require_valid(Ok(AppConfig::default())).unwrap();
        assert_eq!(config.gateway.port, AppConfig::default().gateway.port);
    }
}
