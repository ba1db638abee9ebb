//! WeatherCanvas CLI.
//!
//! Commands:
//! - `init`    — Write a default config file
//! - `run`     — Scheduler + orchestrator + HTTP gateway
//! - `cycle`   — Run one full cycle now
//! - `prompt`  — Compose a prompt without rendering
//! - `render`  — Render an image from the latest prompt
//! - `prune`   — Apply the retention limit to the image directory
//! - `status`  — Show configuration and stored images
//! - `doctor`  — Diagnose configuration and connectivity

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "weathercanvas",
    about = "WeatherCanvas — turn the current weather into generated artwork",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "WEATHERCANVAS_LOG_JSON")]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Start schedules, the orchestrator and the HTTP gateway
    Run {
        /// Override the gateway port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one full cycle now
    Cycle,

    /// Compose a prompt from the current conditions without rendering
    Prompt,

    /// Compose a prompt and render it with explicit image options
    Render {
        /// Image model (dall-e-2 or dall-e-3)
        #[arg(short, long)]
        model: Option<String>,

        /// Image size, e.g. 1024x1024
        #[arg(short, long)]
        size: Option<String>,

        /// Quality (dall-e-3 only)
        #[arg(long)]
        quality: Option<String>,

        /// Style (dall-e-3 only)
        #[arg(long)]
        style: Option<String>,
    },

    /// Evict old images down to the retention limit
    Prune {
        /// Override the configured retention limit
        #[arg(short, long)]
        keep: Option<usize>,
    },

    /// Show configuration and stored images
    Status,

    /// Diagnose configuration and connectivity
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Init { force } => commands::init::run(force).await?,
        Commands::Run { port } => commands::run::run(port).await?,
        Commands::Cycle => commands::cycle::run().await?,
        Commands::Prompt => commands::prompt::run().await?,
        Commands::Render {
            model,
            size,
            quality,
            style,
        } => {
            commands::render::run(commands::render::Overrides {
                model,
                size,
                quality,
                style,
            })
            .await?
        }
        Commands::Prune { keep } => commands::prune::run(keep).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
