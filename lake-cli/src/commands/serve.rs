//! Runs the attribution cache against a telemetry snapshot file
//!
//! The snapshot is re-read at every poll, so replacing the file with a newer
//! epoch triggers a refresh. Each newly published snapshot is logged.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;
use lake_rewards::{
    AttributionCache, NetworkModelBuilder, PathValue, RewardsConfig, SnapshotSource,
};
use tracing::info;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Telemetry snapshot JSON
    #[arg(short, long)]
    pub snapshot: PathBuf,

    /// Override the epoch poll interval in seconds
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Print each new snapshot to stdout as JSON
    #[arg(long)]
    pub print: bool,
}

pub async fn run(args: ServeArgs, config: &RewardsConfig) -> Result<()> {
    if !args.snapshot.exists() {
        bail!("snapshot file {} not found", args.snapshot.display());
    }

    let mut config = config.clone();
    if let Some(secs) = args.poll_interval {
        config.cache.poll_interval_secs = secs;
        config.validate()?;
    }

    let source = Arc::new(SnapshotSource::new(&args.snapshot));
    let builder = NetworkModelBuilder::new(
        source.clone(),
        config.model.clone(),
        config.latency.clone(),
    );
    let cache = AttributionCache::new(builder, source, Arc::new(PathValue), &config);

    info!(snapshot = %args.snapshot.display(), "Starting attribution service");
    cache.start();

    let mut last_published = None;
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, shutting down");
                break;
            }
            _ = ticker.tick() => {
                let Some(snapshot) = cache.get_simulation() else {
                    continue;
                };
                if last_published == Some((snapshot.epoch, snapshot.computed_at)) {
                    continue;
                }
                last_published = Some((snapshot.epoch, snapshot.computed_at));

                for value in &snapshot.values {
                    info!(
                        epoch = snapshot.epoch,
                        operator = %value.operator,
                        value = value.value,
                        proportion = value.proportion,
                        "Operator value"
                    );
                }
                if let Some(network) = cache.get_live_network() {
                    info!(
                        devices = network.device_count,
                        links = network.link_count,
                        operators = network.operator_count,
                        metros = network.metro_count,
                        "Live network"
                    );
                }
                if args.print {
                    super::print_json(snapshot.as_ref(), false)?;
                }
            }
        }
    }

    cache.stop().await;
    Ok(())
}
