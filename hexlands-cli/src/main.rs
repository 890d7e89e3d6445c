//! HEXLANDS CLI - Command-line interface
//!
//! Commands:
//! - serve: Start the HTTP API server
//! - simulate: Play AI-only games and report outcomes
//! - scenario: Generate a random scenario file

mod scenario_cmd;
mod server;
mod simulate;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hexlands")]
#[command(about = "HEXLANDS hex-grid strategy rules engine")]
struct Cli {
    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve(server::ServerArgs),
    /// Play AI-only games on a scenario
    Simulate(simulate::SimulateArgs),
    /// Generate a random scenario file
    Scenario(scenario_cmd::ScenarioArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Serve(args) => server::run(args),
        Commands::Simulate(args) => simulate::run(args),
        Commands::Scenario(args) => scenario_cmd::run(args),
    }
}
