use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use lake_rewards::{Operator, PathValue, RewardsConfig, Simulator};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{print_json, read_model};

#[derive(Debug, Args)]
pub struct LinkEstimateArgs {
    /// Operator whose links are scored
    #[arg(short, long)]
    pub operator: String,

    /// Network model JSON (stdin when omitted or `-`)
    pub input: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

pub async fn run(args: LinkEstimateArgs, config: &RewardsConfig) -> Result<()> {
    let model = read_model(args.input.as_deref())?;
    let operator = Operator::from(args.operator.as_str());
    let simulator = Simulator::new(config);

    let result = tokio::task::spawn_blocking(move || {
        simulator.estimate_links(&operator, &model, &PathValue, &CancellationToken::new())
    })
    .await??;
    info!(
        links = result.results.len(),
        total = result.total_value,
        "Link estimate complete"
    );
    print_json(&result, args.pretty)
}
