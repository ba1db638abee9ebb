//! `weathercanvas init` — write a default config file.

use weathercanvas_config::AppConfig;

pub async fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🌦️  WeatherCanvas — Setup");
    println!("========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    }

    if config_path.exists() && !force {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or re-run with --force.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Wrote config.toml at: {}", config_path.display());

    let images = AppConfig::default().storage.resolved_directory();
    if !images.exists() {
        std::fs::create_dir_all(&images)?;
        println!("✅ Created image directory: {}", images.display());
    }

    println!("\n📝 Next steps:");
    println!("   1. Set api_key in config.toml (or export OPENAI_API_KEY)");
    println!("   2. Optionally set location_name and the [weather] section");
    println!("   3. Run `weathercanvas cycle` to generate a first image");

    Ok(())
}
