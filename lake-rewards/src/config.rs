//! Configuration for the attribution engine
//!
//! Every field has a default, so a TOML file only needs the values it
//! overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RewardsError};

/// Largest player count whose full coalition table fits in memory comfortably
pub const MAX_EXACT_PLAYERS: usize = 24;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardsConfig {
    pub cache: CacheConfig,
    pub model: ModelConfig,
    pub latency: LatencyConfig,
    pub value: ValueConfig,
    pub shapley: ShapleyConfig,
}

impl RewardsConfig {
    /// Parse a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| RewardsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RewardsError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f64| {
            if (0.0..=1.0).contains(&v) && v > 0.0 {
                Ok(())
            } else {
                Err(RewardsError::Config(format!("{name} must be in (0, 1], got {v}")))
            }
        };
        unit("model.operator_uptime", self.model.operator_uptime)?;
        unit("model.default_link_uptime", self.model.default_link_uptime)?;
        unit("model.min_demand_weight", self.model.min_demand_weight)?;

        let multiplier = self.model.demand_multiplier;
        if !multiplier.is_finite() || multiplier < 0.0 {
            return Err(RewardsError::Config(format!(
                "model.demand_multiplier must be finite and not negative, got {multiplier}"
            )));
        }
        if self.value.latency_scale_ms <= 0.0 {
            return Err(RewardsError::Config(
                "value.latency_scale_ms must be positive".into(),
            ));
        }
        if self.model.contiguity_bonus < 0.0 || self.value.hop_penalty_ms < 0.0 {
            return Err(RewardsError::Config(
                "contiguity bonus and hop penalty must not be negative".into(),
            ));
        }
        if self.shapley.max_players > 63 {
            return Err(RewardsError::Config(
                "shapley.max_players cannot exceed 63".into(),
            ));
        }
        if self.shapley.max_exact_players > MAX_EXACT_PLAYERS {
            return Err(RewardsError::Config(format!(
                "shapley.max_exact_players cannot exceed {MAX_EXACT_PLAYERS}"
            )));
        }
        if self.shapley.max_exact_players > self.shapley.max_players {
            return Err(RewardsError::Config(
                "shapley.max_exact_players cannot exceed shapley.max_players".into(),
            ));
        }
        if self.shapley.samples == 0 {
            return Err(RewardsError::Config("shapley.samples must be positive".into()));
        }
        if self.cache.poll_interval_secs == 0 || self.cache.refresh_timeout_secs == 0 {
            return Err(RewardsError::Config(
                "cache intervals must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Background refresh settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How often the epoch is polled
    pub poll_interval_secs: u64,
    /// Hard deadline for one refresh attempt
    pub refresh_timeout_secs: u64,
    /// How long `stop` waits for an in-flight refresh
    pub stop_grace_secs: u64,
    /// Deadline for a single epoch query
    pub epoch_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3600,
            refresh_timeout_secs: 600,
            stop_grace_secs: 5,
            epoch_timeout_secs: 30,
        }
    }
}

impl CacheConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }

    pub fn epoch_timeout(&self) -> Duration {
        Duration::from_secs(self.epoch_timeout_secs)
    }
}

/// Network model construction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Probability an operator's segment is up
    pub operator_uptime: f64,
    /// Latency credit (ms) for a path contained in one operator
    pub contiguity_bonus: f64,
    /// Global scaling of demand value
    pub demand_multiplier: f64,
    /// Uptime assigned to every private link
    pub default_link_uptime: f64,
    /// Trailing window for traffic aggregates
    pub traffic_window_hours: u64,
    /// Floor applied to normalized demand weights
    pub min_demand_weight: f64,
    /// Cap on synthesized demands when no traffic is observed
    pub max_synthetic_demands: usize,
    /// Cap on traffic-derived demands, heaviest kept
    pub max_demands: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            operator_uptime: 0.98,
            contiguity_bonus: 5.0,
            demand_multiplier: 1.0,
            default_link_uptime: 0.99,
            traffic_window_hours: 24,
            min_demand_weight: 0.01,
            max_synthetic_demands: 10,
            max_demands: 90,
        }
    }
}

impl ModelConfig {
    pub fn traffic_window(&self) -> Duration {
        Duration::from_secs(self.traffic_window_hours * 3600)
    }
}

/// Great-circle public latency estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    /// Milliseconds per kilometre of fibre
    pub per_km_ms: f64,
    /// Multiplier for routing detours
    pub overhead: f64,
    /// Added to every estimate
    pub floor_ms: f64,
    /// Used when a city has no coordinates
    pub fallback_ms: f64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            per_km_ms: 0.01,
            overhead: 1.2,
            floor_ms: 5.0,
            fallback_ms: 100.0,
        }
    }
}

/// Path quality settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueConfig {
    /// Latency at which path quality drops by a factor of e
    pub latency_scale_ms: f64,
    /// Latency-equivalent cost of each hop
    pub hop_penalty_ms: f64,
}

impl Default for ValueConfig {
    fn default() -> Self {
        Self {
            latency_scale_ms: 100.0,
            hop_penalty_ms: 1.0,
        }
    }
}

/// Coalition enumeration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapleyConfig {
    /// Operators with fewer devices are collapsed into `Others`
    pub collapse_threshold: usize,
    /// Largest player count computed exactly
    pub max_exact_players: usize,
    /// Hard ceiling; above it the computation is refused
    pub max_players: usize,
    /// Permutations sampled by the approximate method
    pub samples: usize,
    /// Seed for permutation sampling
    pub seed: u64,
    /// Relative tolerance of the sum-to-total check
    pub tolerance: f64,
}

impl Default for ShapleyConfig {
    fn default() -> Self {
        Self {
            collapse_threshold: 5,
            max_exact_players: 16,
            max_players: 24,
            samples: 2000,
            seed: 0x5eed_1a4e,
            tolerance: 1e-6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = RewardsConfig::default();
        assert_eq!(config.cache.poll_interval(), Duration::from_secs(3600));
        assert_eq!(config.cache.refresh_timeout(), Duration::from_secs(600));
        assert_eq!(config.shapley.collapse_threshold, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml_str = r#"
[shapley]
collapse_threshold = 3

[model]
contiguity_bonus = 2.5
"#;
        let config = RewardsConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.shapley.collapse_threshold, 3);
        assert_eq!(config.shapley.max_players, 24);
        assert_eq!(config.model.contiguity_bonus, 2.5);
        assert_eq!(config.model.operator_uptime, 0.98);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = RewardsConfig::from_toml_str("").unwrap();
        assert_eq!(config, RewardsConfig::default());
    }

    #[test]
    fn test_rejects_exact_ceiling_above_hard_ceiling() {
        let toml_str = r#"
[shapley]
max_exact_players = 30
max_players = 20
"#;
        let err = RewardsConfig::from_toml_str(toml_str).unwrap_err();
        assert!(matches!(err, RewardsError::Config(_)));
    }

    #[test]
    fn test_rejects_zero_uptime() {
        let mut config = RewardsConfig::default();
        config.model.operator_uptime = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_demand_multiplier() {
        let mut config = RewardsConfig::default();
        config.model.demand_multiplier = -1.0;
        assert!(matches!(config.validate(), Err(RewardsError::Config(_))));

        config.model.demand_multiplier = f64::INFINITY;
        assert!(config.validate().is_err());

        let err = RewardsConfig::from_toml_str("[model]\ndemand_multiplier = -0.5\n").unwrap_err();
        assert!(err.to_string().contains("demand_multiplier"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rewards.toml");
        std::fs::write(&path, "[cache]\npoll_interval_secs = 60\n").unwrap();

        let config = RewardsConfig::load(&path).unwrap();
        assert_eq!(config.cache.poll_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = RewardsConfig::load(Path::new("/nonexistent/rewards.toml")).unwrap_err();
        assert!(matches!(err, RewardsError::Config(_)));
    }
}
