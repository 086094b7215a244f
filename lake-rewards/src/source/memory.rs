//! In-memory source for tests and offline runs

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{
    DeviceRow, EpochSource, LinkRow, MetroLatencyRow, MetroRow, SourceResult, TelemetrySource,
    TrafficRow,
};
use crate::error::SourceError;

#[derive(Debug, Default, Clone)]
struct Tables {
    devices: Vec<DeviceRow>,
    links: Vec<LinkRow>,
    metros: Vec<MetroRow>,
    latencies: Vec<MetroLatencyRow>,
    traffic: Vec<TrafficRow>,
}

/// Mutable in-memory tables with failure and latency injection
#[derive(Debug, Default)]
pub struct MemorySource {
    tables: RwLock<Tables>,
    epoch: AtomicI64,
    unavailable: AtomicBool,
    epoch_unavailable: AtomicBool,
    delay: RwLock<Option<Duration>>,
    device_queries: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_devices(self, devices: Vec<DeviceRow>) -> Self {
        self.tables.write().devices = devices;
        self
    }

    #[must_use]
    pub fn with_links(self, links: Vec<LinkRow>) -> Self {
        self.tables.write().links = links;
        self
    }

    #[must_use]
    pub fn with_metros(self, metros: Vec<MetroRow>) -> Self {
        self.tables.write().metros = metros;
        self
    }

    #[must_use]
    pub fn with_latencies(self, latencies: Vec<MetroLatencyRow>) -> Self {
        self.tables.write().latencies = latencies;
        self
    }

    #[must_use]
    pub fn with_traffic(self, traffic: Vec<TrafficRow>) -> Self {
        self.tables.write().traffic = traffic;
        self
    }

    #[must_use]
    pub fn with_epoch(self, epoch: i64) -> Self {
        self.set_epoch(epoch);
        self
    }

    pub fn set_epoch(&self, epoch: i64) {
        self.epoch.store(epoch, Ordering::SeqCst);
    }

    pub fn set_links(&self, links: Vec<LinkRow>) {
        self.tables.write().links = links;
    }

    /// Make every telemetry query fail as unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make epoch queries fail
    pub fn set_epoch_unavailable(&self, unavailable: bool) {
        self.epoch_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every device query, simulating a slow store
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write() = delay;
    }

    /// Number of device queries served so far (one per build)
    pub fn device_queries(&self) -> usize {
        self.device_queries.load(Ordering::SeqCst)
    }

    fn check(&self) -> SourceResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("memory source offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TelemetrySource for MemorySource {
    async fn devices(&self) -> SourceResult<Vec<DeviceRow>> {
        self.device_queries.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check()?;
        Ok(self.tables.read().devices.clone())
    }

    async fn links(&self) -> SourceResult<Vec<LinkRow>> {
        self.check()?;
        Ok(self.tables.read().links.clone())
    }

    async fn metros(&self) -> SourceResult<Vec<MetroRow>> {
        self.check()?;
        Ok(self.tables.read().metros.clone())
    }

    async fn metro_latencies(&self) -> SourceResult<Vec<MetroLatencyRow>> {
        self.check()?;
        Ok(self.tables.read().latencies.clone())
    }

    async fn traffic(&self, _window: Duration) -> SourceResult<Vec<TrafficRow>> {
        self.check()?;
        Ok(self.tables.read().traffic.clone())
    }
}

#[async_trait]
impl EpochSource for MemorySource {
    async fn current_epoch(&self) -> SourceResult<i64> {
        if self.epoch_unavailable.load(Ordering::SeqCst) {
            return Err(SourceError::Query("epoch table missing".into()));
        }
        Ok(self.epoch.load(Ordering::SeqCst))
    }
}
