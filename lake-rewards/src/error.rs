//! Error types for lake-rewards

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a telemetry or epoch source
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be reached
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// The source was reached but a query failed
    #[error("Query failed: {0}")]
    Query(String),

    /// Reading a snapshot file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot file could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Error type for attribution refreshes and computations
#[derive(Debug, Error)]
pub enum RewardsError {
    /// The telemetry source could not be reached
    #[error("Telemetry data unavailable: {0}")]
    DataUnavailable(#[source] SourceError),

    /// The build produced no usable devices
    #[error("Topology is empty after dropping unusable devices")]
    EmptyTopology,

    /// Too many players remain after reduction for the configured ceiling
    #[error("{players} players exceed the ceiling of {ceiling}; lower the collapse threshold")]
    PlayerCountTooLarge { players: usize, ceiling: usize },

    /// A refresh exceeded its wall-clock deadline
    #[error("Computation exceeded its deadline of {0:?}")]
    ComputationTimeout(Duration),

    /// Operator values do not sum to the grand coalition value
    #[error("Operator values sum to {sum} but the grand coalition is worth {total}")]
    NumericalInconsistency { sum: f64, total: f64 },

    /// The computation was cancelled before it finished
    #[error("Computation cancelled")]
    Cancelled,

    /// The network model is internally inconsistent
    #[error("Invalid network model: {0}")]
    InvalidModel(String),

    /// A configuration value is out of range
    #[error("Configuration error: {0}")]
    Config(String),

    /// The computation task panicked or was aborted
    #[error("Computation task failed: {0}")]
    Task(String),
}

impl RewardsError {
    /// Stable label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataUnavailable(_) => "data_unavailable",
            Self::EmptyTopology => "empty_topology",
            Self::PlayerCountTooLarge { .. } => "player_count_too_large",
            Self::ComputationTimeout(_) => "computation_timeout",
            Self::NumericalInconsistency { .. } => "numerical_inconsistency",
            Self::Cancelled => "cancelled",
            Self::InvalidModel(_) => "invalid_model",
            Self::Config(_) => "config",
            Self::Task(_) => "task",
        }
    }

    /// Whether the next scheduled refresh may succeed without operator action
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DataUnavailable(_)
                | Self::EmptyTopology
                | Self::ComputationTimeout(_)
                | Self::Cancelled
        )
    }
}

impl From<SourceError> for RewardsError {
    fn from(err: SourceError) -> Self {
        Self::DataUnavailable(err)
    }
}

/// Result type alias for attribution operations
pub type Result<T> = std::result::Result<T, RewardsError>;
