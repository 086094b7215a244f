use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use lake_rewards::{PathValue, RewardsConfig, Simulator};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{print_json, read_model};

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Network model JSON (stdin when omitted or `-`)
    pub input: Option<PathBuf>,

    /// Print exactness and total alongside the values
    #[arg(long)]
    pub detailed: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

pub async fn run(args: SimulateArgs, config: &RewardsConfig) -> Result<()> {
    let model = read_model(args.input.as_deref())?;
    let simulator = Simulator::new(config);

    let result = tokio::task::spawn_blocking(move || {
        simulator.simulate(&model, &PathValue, &CancellationToken::new())
    })
    .await??;
    info!(
        total = result.total,
        operators = result.values.len(),
        exact = result.exactness.is_exact(),
        "Simulation complete"
    );

    if args.detailed {
        print_json(&result, args.pretty)
    } else {
        print_json(&result.values, args.pretty)
    }
}
