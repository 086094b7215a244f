//! Background-refreshed attribution cache
//!
//! One task polls the epoch source and owns the write path. Readers take a
//! short read lock and clone an `Arc` to the current snapshot, so they never
//! wait on a refresh. A refresh builds the model, runs the computation on the
//! blocking pool and swaps the snapshot in one write; any failure leaves the
//! previous snapshot in place. A computation abandoned at its deadline keeps
//! the cache marked as computing until it drains, and no new refresh starts
//! before then.

mod snapshot;

pub use snapshot::{CacheStatus, Simulation};

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, sleep_until, timeout, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::builder::NetworkModelBuilder;
use crate::config::{CacheConfig, RewardsConfig};
use crate::error::{Result, RewardsError};
use crate::metrics;
use crate::model::NetworkSummary;
use crate::shapley::Attribution;
use crate::simulate::Simulator;
use crate::source::EpochSource;
use crate::value::ValueFunction;

#[derive(Debug, Default)]
struct State {
    snapshot: Option<Arc<Simulation>>,
    computing: bool,
    network: Option<NetworkSummary>,
    /// Blocking computation abandoned at its deadline, still running
    draining: Option<JoinHandle<Result<Attribution>>>,
}

struct Inner {
    builder: NetworkModelBuilder,
    epochs: Arc<dyn EpochSource>,
    value_fn: Arc<dyn ValueFunction>,
    simulator: Simulator,
    config: CacheConfig,
    state: RwLock<State>,
}

/// Holds the latest attribution and keeps it current
pub struct AttributionCache {
    inner: Arc<Inner>,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AttributionCache {
    pub fn new(
        builder: NetworkModelBuilder,
        epochs: Arc<dyn EpochSource>,
        value_fn: Arc<dyn ValueFunction>,
        config: &RewardsConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                builder,
                epochs,
                value_fn,
                simulator: Simulator::new(config),
                config: config.cache.clone(),
                state: RwLock::new(State::default()),
            }),
            shutdown: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Spawn the polling task; the first check runs immediately
    ///
    /// Must be called from within a Tokio runtime. Calling it twice is a no-op.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            warn!("Attribution cache already started");
            return;
        }

        let inner = self.inner.clone();
        let shutdown = self.shutdown.clone();
        *task = Some(tokio::spawn(async move {
            let period = inner.config.poll_interval();
            info!(poll_interval_secs = period.as_secs(), "Attribution cache started");

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => inner.check(&shutdown).await,
                }
            }

            info!("Attribution cache stopped");
        }));
    }

    /// Cancel polling and any in-flight refresh, waiting up to the grace period
    pub async fn stop(&self) {
        self.shutdown.cancel();
        let grace = self.inner.config.stop_grace();
        let deadline = Instant::now() + grace;

        let handle = self.task.lock().take();
        if let Some(mut handle) = handle {
            match timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => debug!("Polling task joined"),
                Ok(Err(e)) => warn!(error = %e, "Polling task panicked"),
                Err(_) => {
                    warn!(grace_secs = grace.as_secs(), "Polling task did not stop within grace period, aborting");
                    handle.abort();
                }
            }
        }

        let draining = self.inner.state.write().draining.take();
        if let Some(draining) = draining {
            match timeout_at(deadline, draining).await {
                Ok(_) => debug!("Abandoned computation drained"),
                Err(_) => warn!(grace_secs = grace.as_secs(), "Abandoned computation still running after grace period"),
            }
            self.inner.state.write().computing = false;
        }
    }

    /// Run one poll cycle now, refreshing if the epoch moved or nothing is cached
    ///
    /// Skipped when a refresh is already in flight.
    pub async fn refresh_if_stale(&self) {
        self.inner.check(&self.shutdown).await;
    }

    pub fn is_ready(&self) -> bool {
        self.inner.state.read().snapshot.is_some()
    }

    /// Latest complete snapshot, never blocking on a refresh
    pub fn get_simulation(&self) -> Option<Arc<Simulation>> {
        self.inner.state.read().snapshot.clone()
    }

    pub fn status(&self) -> CacheStatus {
        let state = self.inner.state.read();
        CacheStatus::from_flags(state.snapshot.is_some(), state.computing)
    }

    /// Counts from the last successfully built network
    pub fn get_live_network(&self) -> Option<NetworkSummary> {
        self.inner.state.read().network
    }
}

impl Drop for AttributionCache {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl Inner {
    async fn check(&self, shutdown: &CancellationToken) {
        if self.draining() {
            debug!("Abandoned computation still draining, skipping poll");
            return;
        }

        let observed = match timeout(self.config.epoch_timeout(), self.epochs.current_epoch()).await {
            Ok(Ok(epoch)) => Some(epoch),
            Ok(Err(e)) => {
                warn!(error = %e, "Epoch query failed");
                None
            }
            Err(_) => {
                warn!(timeout_secs = self.config.epoch_timeout().as_secs(), "Epoch query timed out");
                None
            }
        };

        let last = self.state.read().snapshot.as_ref().map(|s| s.epoch);
        let epoch = match (observed, last) {
            (Some(epoch), Some(last)) if epoch > last => epoch,
            (Some(_), Some(_)) | (None, Some(_)) => return,
            (Some(epoch), None) => epoch,
            // never computed: refresh even without an epoch
            (None, None) => 0,
        };
        self.refresh(epoch, shutdown).await;
    }

    /// Whether an abandoned computation is still running; clears it once done
    fn draining(&self) -> bool {
        let mut state = self.state.write();
        match &state.draining {
            Some(handle) if !handle.is_finished() => true,
            Some(_) => {
                debug!("Abandoned computation finished");
                state.draining = None;
                state.computing = false;
                false
            }
            None => false,
        }
    }

    async fn refresh(&self, epoch: i64, shutdown: &CancellationToken) {
        {
            let mut state = self.state.write();
            if state.computing {
                debug!("Refresh already in flight, skipping");
                return;
            }
            state.computing = true;
        }

        info!(epoch, "Refreshing attribution");
        let started = Instant::now();
        let cancel = shutdown.child_token();
        let outcome = self.compute(epoch, &cancel, started + self.config.refresh_timeout()).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok((simulation, network)) => {
                info!(
                    epoch,
                    total = simulation.total,
                    operators = simulation.values.len(),
                    exact = simulation.exactness.is_exact(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Published attribution snapshot"
                );
                metrics::record_refresh("success", elapsed);
                metrics::record_snapshot(simulation.total, simulation.epoch);
                let mut state = self.state.write();
                state.snapshot = Some(Arc::new(simulation));
                state.network = Some(network);
                state.computing = false;
            }
            Err(e) => {
                if shutdown.is_cancelled() {
                    info!(epoch, "Refresh abandoned on shutdown");
                } else if e.is_retryable() {
                    warn!(epoch, error = %e, kind = e.kind(), "Refresh failed, keeping previous snapshot");
                } else {
                    error!(epoch, error = %e, kind = e.kind(), "Refresh failed, keeping previous snapshot");
                }
                metrics::record_refresh(e.kind(), elapsed);
                let mut state = self.state.write();
                state.computing = state.draining.is_some();
            }
        }
    }

    async fn compute(
        &self,
        epoch: i64,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> Result<(Simulation, NetworkSummary)> {
        let timed_out = || RewardsError::ComputationTimeout(self.config.refresh_timeout());

        let model = tokio::select! {
            _ = cancel.cancelled() => return Err(RewardsError::Cancelled),
            _ = sleep_until(deadline) => return Err(timed_out()),
            model = self.builder.build() => model?,
        };
        let network = model.summary();

        let simulator = self.simulator.clone();
        let value_fn = self.value_fn.clone();
        let token = cancel.clone();
        let mut work = tokio::task::spawn_blocking(move || {
            simulator.simulate(&model, value_fn.as_ref(), &token)
        });

        let joined = tokio::select! {
            joined = &mut work => Some(joined),
            _ = cancel.cancelled() => None,
            _ = sleep_until(deadline) => None,
        };
        let Some(joined) = joined else {
            let err = if cancel.is_cancelled() {
                RewardsError::Cancelled
            } else {
                cancel.cancel();
                timed_out()
            };
            // the blocking task stops at its next evaluation; hold it until then
            self.state.write().draining = Some(work);
            return Err(err);
        };

        let attribution = joined.map_err(|e| RewardsError::Task(e.to_string()))??;
        Ok((Simulation::new(attribution, epoch), network))
    }
}
