//! Command-line driver for the DRC engine: runs the compressor stage
//! against WAV files (or synthetic scenario inputs) without a real
//! pipeline host.

mod commands;
mod presets;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sonido-drc", about = "Dynamic range compressor CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a WAV file through the compressor stage
    Process(commands::process::ProcessArgs),
    /// Display WAV file metadata
    Info(commands::info::InfoArgs),
    /// Run one of the spec's end-to-end scenarios (S1-S6) and write the result
    Scenario(commands::scenario::ScenarioArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    tracing::debug!(command = ?std::mem::discriminant(&cli.command), "dispatching command");

    match cli.command {
        Commands::Process(args) => commands::process::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Scenario(args) => commands::scenario::run(args),
    }
}
