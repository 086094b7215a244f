use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lake_rewards::RewardsConfig;
use toml::Table;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user, then explicit file)
    pub fn load(explicit: Option<&Path>) -> Result<RewardsConfig> {
        let mut merged = Table::new();

        // Layer 1: User config
        if let Some(user_path) = Self::user_config_path()
            && user_path.exists()
        {
            merge(&mut merged, Self::read(&user_path)?);
        }

        // Layer 2: --config
        if let Some(path) = explicit {
            merge(&mut merged, Self::read(path)?);
        }

        let contents = toml::to_string(&merged)?;
        Ok(RewardsConfig::from_toml_str(&contents)?)
    }

    /// User config path (`$XDG_CONFIG_HOME/lake/rewards.toml` on Linux)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lake").join("rewards.toml"))
    }

    fn read(path: &Path) -> Result<Table> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }
}

/// Overlay keys replace base keys; nested tables merge
fn merge(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge(existing, incoming)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
