//! `weathercanvas prompt` — compose only.

use weathercanvas_config::ScheduleAction;
use weathercanvas_workflow::Trigger;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let orchestrator = super::orchestrator(&config)?;

    let report = orchestrator
        .compose_prompt(&Trigger::manual("cli", ScheduleAction::Prompt))
        .await?;

    match &report.prompt {
        Some(bundle) => super::print_prompt(bundle),
        None => println!("⚠️  The model returned no prompt"),
    }

    Ok(())
}
