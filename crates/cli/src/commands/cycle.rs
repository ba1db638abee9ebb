//! `weathercanvas cycle` — one full compose/generate/evict cycle.

use weathercanvas_config::ScheduleAction;
use weathercanvas_workflow::Trigger;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let orchestrator = super::orchestrator(&config)?;

    let report = orchestrator
        .run_cycle(&Trigger::manual("cli", ScheduleAction::Cycle))
        .await?;

    if let Some(bundle) = &report.prompt {
        super::print_prompt(bundle);
    }
    match &report.image {
        Some(image) => super::print_image(image),
        None => println!("⚠️  No image generated"),
    }
    if report.evicted > 0 {
        println!("🧹 Evicted {} old image(s)", report.evicted);
    }

    Ok(())
}
