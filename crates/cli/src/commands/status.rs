//! `weathercanvas status` — configuration summary and stored images.

use weathercanvas_config::AppConfig;
use weathercanvas_gallery::store::list_images;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let images_dir = config.storage.resolved_directory();

    println!("🌦️  WeatherCanvas Status");
    println!("======================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Text model:   {}", config.text_model);
    println!("  Image model:  {} ({})", config.image.model, config.image.size);
    println!(
        "  Location:     {}",
        config.location_name.as_deref().unwrap_or("(from weather source)")
    );
    println!("  Weather:      {:?}", config.weather.source);
    println!("  Admission:    {:?}", config.admission);
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);
    println!("  Images dir:   {}", images_dir.display());
    println!("  Retention:    {} image(s)", config.storage.max_images_retained);

    let enabled: Vec<_> = config.schedules.iter().filter(|s| s.enabled).collect();
    println!("  Schedules:    {} enabled", enabled.len());
    for schedule in enabled {
        println!("    - {} [{}] {:?}", schedule.name, schedule.cron, schedule.action);
    }

    let images = list_images(&images_dir).await?;
    println!("\n  Stored images: {}", images.len());
    for image in images.iter().rev() {
        println!("    - {} ({} bytes)", image.file_name, image.byte_len);
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `weathercanvas init` first");
    }

    Ok(())
}
