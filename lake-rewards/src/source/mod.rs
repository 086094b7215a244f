//! Read-only data sources consumed by the builder and the cache
//!
//! The telemetry store and the epoch marker are external collaborators; this
//! module defines the rows they return and the traits the rest of the crate
//! is written against.

mod memory;
mod snapshot;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

pub use memory::MemorySource;
pub use snapshot::{SnapshotFile, SnapshotSource};

/// Result type for source queries
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Operational status of a device or link
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Activated,
    Pending,
    SoftDrained,
    HardDrained,
    Suspended,
}

impl Status {
    pub fn is_active(self) -> bool {
        self == Self::Activated
    }
}

/// A device as reported by the telemetry store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRow {
    pub code: String,
    /// Owning contributor code; empty when unresolved
    #[serde(default)]
    pub operator: String,
    /// Metro code; absent when the device has no metro assignment
    #[serde(default)]
    pub metro: Option<String>,
    #[serde(default)]
    pub status: Status,
}

/// A private link as reported by the telemetry store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRow {
    pub side_a: String,
    pub side_z: String,
    /// Measured round-trip time
    #[serde(default)]
    pub rtt_ns: Option<u64>,
    #[serde(default)]
    pub bandwidth_bps: u64,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub shared_risk_group: Option<u32>,
}

/// Metro metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetroRow {
    pub code: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Measured public-internet latency between two metros
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetroLatencyRow {
    pub origin: String,
    pub target: String,
    pub rtt_ms: f64,
}

/// Traffic volume between two metros over a trailing window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficRow {
    pub origin: String,
    pub target: String,
    pub bytes: u64,
}

/// Tabular access to current topology, metrics and traffic
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn devices(&self) -> SourceResult<Vec<DeviceRow>>;

    async fn links(&self) -> SourceResult<Vec<LinkRow>>;

    async fn metros(&self) -> SourceResult<Vec<MetroRow>>;

    async fn metro_latencies(&self) -> SourceResult<Vec<MetroLatencyRow>>;

    /// Aggregated volume per metro pair over the trailing `window`
    async fn traffic(&self, window: Duration) -> SourceResult<Vec<TrafficRow>>;
}

/// The external "world moved forward" marker
#[async_trait]
pub trait EpochSource: Send + Sync {
    async fn current_epoch(&self) -> SourceResult<i64>;
}
