use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "lake-rewards", about = "Attribute network value across operators")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file layered over the user config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute operator values for a network model
    Simulate(commands::simulate::SimulateArgs),
    /// Compare operator values of two network models
    Compare(commands::compare::CompareArgs),
    /// Split one operator's value across its links
    LinkEstimate(commands::link_estimate::LinkEstimateArgs),
    /// Keep attribution current from a telemetry snapshot file
    Serve(commands::serve::ServeArgs),
    /// Inspect configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = config::ConfigLoader::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate(args) => commands::simulate::run(args, &config).await,
        Commands::Compare(args) => commands::compare::run(args, &config).await,
        Commands::LinkEstimate(args) => commands::link_estimate::run(args, &config).await,
        Commands::Serve(args) => commands::serve::run(args, &config).await,
        Commands::Config(args) => commands::config::run(args, &config, cli.config.as_deref()),
    }
}
