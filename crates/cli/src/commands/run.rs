//! `weathercanvas run` — the long-running service.

use tracing::{info, warn};
use weathercanvas_workflow::Scheduler;

pub async fn run(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;
    if let Some(port) = port {
        config.gateway.port = port;
    }

    let scheduler = Scheduler::from_config(&config.schedules)?;
    let orchestrator = super::orchestrator(&config)?;

    println!("🌦️  WeatherCanvas — Starting");
    println!("   Gateway:   {}:{}", config.gateway.host, config.gateway.port);
    println!("   Schedules: {}", scheduler.schedules().len());
    println!("   Images:    {}", orchestrator.store().directory().display());

    let mut events = orchestrator.events().subscribe();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!(event = ?event, "Domain event");
        }
    });

    let (triggers, _scheduler_handle) = scheduler.start();
    tokio::spawn(orchestrator.clone().serve(triggers));
    info!("Scheduler started");

    // Serves until the listener fails.
    if let Err(e) = weathercanvas_gateway::start(&config, orchestrator).await {
        warn!(error = %e, "Gateway stopped");
        return Err(e);
    }

    Ok(())
}
