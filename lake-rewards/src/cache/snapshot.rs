use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::OperatorValue;
use crate::shapley::{Attribution, Exactness};

/// One published attribution, replaced as a whole
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub values: Vec<OperatorValue>,
    pub total: f64,
    pub computed_at: DateTime<Utc>,
    pub epoch: i64,
    pub exactness: Exactness,
}

impl Simulation {
    pub fn new(attribution: Attribution, epoch: i64) -> Self {
        Self {
            values: attribution.values,
            total: attribution.total,
            computed_at: Utc::now(),
            epoch,
            exactness: attribution.exactness,
        }
    }
}

/// Lifecycle of the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    /// Nothing computed yet, nothing running
    Uninitialized,
    /// First computation in flight
    Computing,
    Ready,
    /// Refresh in flight while the previous snapshot is served
    ComputingStale,
}

impl CacheStatus {
    pub(crate) fn from_flags(ready: bool, computing: bool) -> Self {
        match (ready, computing) {
            (false, false) => Self::Uninitialized,
            (false, true) => Self::Computing,
            (true, false) => Self::Ready,
            (true, true) => Self::ComputingStale,
        }
    }
}
