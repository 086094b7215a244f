use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use lake_rewards::{PathValue, RewardsConfig, Simulator};
use tokio_util::sync::CancellationToken;

use super::{print_json, read_model};

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Baseline network model JSON
    pub baseline: PathBuf,

    /// Modified network model JSON
    pub modified: PathBuf,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

pub async fn run(args: CompareArgs, config: &RewardsConfig) -> Result<()> {
    let baseline = read_model(Some(&args.baseline))?;
    let modified = read_model(Some(&args.modified))?;
    let simulator = Simulator::new(config);

    let result = tokio::task::spawn_blocking(move || {
        simulator.compare(&baseline, &modified, &PathValue, &CancellationToken::new())
    })
    .await??;
    print_json(&result, args.pretty)
}
