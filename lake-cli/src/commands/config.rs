use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use lake_rewards::RewardsConfig;

use crate::config::ConfigLoader;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Show configuration file paths
    Path,
}

pub fn run(args: ConfigArgs, config: &RewardsConfig, explicit: Option<&Path>) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            println!("{}", toml::to_string_pretty(config)?);
        }
        ConfigCommands::Path => {
            println!("User config:     {:?}", ConfigLoader::user_config_path());
            println!("Explicit config: {:?}", explicit);
        }
    }
    Ok(())
}
