//! Subcommands, one module each

pub mod compare;
pub mod config;
pub mod link_estimate;
pub mod serve;
pub mod simulate;

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use lake_rewards::NetworkModel;
use serde::Serialize;

/// Read a network model from a file, or stdin for `None` or `-`
pub(crate) fn read_model(path: Option<&Path>) -> Result<NetworkModel> {
    let contents = match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading model from stdin")?;
            buf
        }
    };
    parse_model(&contents)
}

pub(crate) fn parse_model(contents: &str) -> Result<NetworkModel> {
    let model: NetworkModel = serde_json::from_str(contents).context("parsing network model")?;
    model.validate()?;
    Ok(model)
}

pub(crate) fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}
