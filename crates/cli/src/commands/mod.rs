pub mod cycle;
pub mod doctor;
pub mod init;
pub mod prompt;
pub mod prune;
pub mod render;
pub mod run;
pub mod status;

use std::sync::Arc;

use weathercanvas_config::AppConfig;
use weathercanvas_core::artifact::{GeneratedImage, PromptBundle};
use weathercanvas_core::event::EventBus;
use weathercanvas_core::state::CanvasState;
use weathercanvas_workflow::Orchestrator;

pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Wire providers, state and event bus into a ready orchestrator.
pub(crate) fn orchestrator(
    config: &AppConfig,
) -> Result<Arc<Orchestrator>, Box<dyn std::error::Error>> {
    let services = weathercanvas_providers::build_from_config(config)
        .map_err(|e| format!("Failed to set up providers: {e}"))?;
    Ok(Arc::new(Orchestrator::from_config(
        config,
        services,
        Arc::new(CanvasState::new()),
        Arc::new(EventBus::default()),
    )))
}

pub(crate) fn print_prompt(bundle: &PromptBundle) {
    println!("📝 Input:  {}", bundle.composed_input);
    println!("🎨 Prompt: {}", bundle.generated_prompt);
}

pub(crate) fn print_image(image: &GeneratedImage) {
    println!("🖼️  Saved:  {} ({} bytes)", image.stored_path.display(), image.byte_len);
    println!("   Local:  {}", image.local_path);
    println!("   URL:    {}", image.full_url);
}
