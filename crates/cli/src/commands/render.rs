//! `weathercanvas render` — compose a fresh prompt and render it with
//! per-run image options.

use weathercanvas_config::ScheduleAction;
use weathercanvas_core::image::ImageModel;
use weathercanvas_workflow::Trigger;

/// Command-line overrides of the configured image options.
pub struct Overrides {
    pub model: Option<String>,
    pub size: Option<String>,
    pub quality: Option<String>,
    pub style: Option<String>,
}

pub async fn run(overrides: Overrides) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let orchestrator = super::orchestrator(&config)?;

    let mut options = orchestrator.image_options().clone();
    if let Some(model) = overrides.model {
        options.model = model.parse::<ImageModel>()?;
    }
    if let Some(size) = overrides.size {
        options.size = size;
    }
    if let Some(quality) = overrides.quality {
        options.quality = quality;
    }
    if let Some(style) = overrides.style {
        options.style = style;
    }

    let composed = orchestrator
        .compose_prompt(&Trigger::manual("cli", ScheduleAction::Prompt))
        .await?;
    if let Some(bundle) = &composed.prompt {
        super::print_prompt(bundle);
    }

    println!("⏳ Rendering with {} at {}...", options.model, options.size);
    let report = orchestrator.render_latest(Some(options)).await?;
    if let Some(image) = &report.image {
        super::print_image(image);
    }
    if report.evicted > 0 {
        println!("🧹 Evicted {} old image(s)", report.evicted);
    }

    Ok(())
}
