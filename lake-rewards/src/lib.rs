//! lake-rewards: Shapley attribution of network value across operators
//!
//! This crate splits the value of a multi-operator network among the operators
//! that built it:
//!
//! - **Model building** - [`NetworkModelBuilder`] turns telemetry rows from a
//!   [`TelemetrySource`] into a [`NetworkModel`]
//! - **Reduction** - [`CoalitionReducer`] folds small operators into `Others`
//! - **Valuation** - [`PathValue`] scores a [`Coalition`] by best-path demand quality
//! - **Attribution** - [`ShapleyComputer`] and [`Simulator`] produce per-operator values
//! - **Caching** - [`AttributionCache`] keeps the latest result readable while
//!   refreshing in the background on epoch changes
//!
//! # Quick Start
//!
//! ```no_run
//! use lake_rewards::{NetworkModel, PathValue, RewardsConfig, Simulator};
//! use tokio_util::sync::CancellationToken;
//!
//! fn example(model: &NetworkModel) -> lake_rewards::Result<()> {
//!     let simulator = Simulator::new(&RewardsConfig::default());
//!     let result = simulator.simulate(model, &PathValue, &CancellationToken::new())?;
//!     for value in &result.values {
//!         println!("{}: {:.4}", value.operator, value.value);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! epoch poll ─► AttributionCache ─► NetworkModelBuilder ─► CoalitionReducer
//!                     ▲                                          │
//!                     │                                          ▼
//!               Simulation ◄── ShapleyComputer ◄── Game + ValueFunction
//! ```

pub mod builder;
pub mod cache;
pub mod coalition;
pub mod compare;
pub mod config;
pub mod error;
pub mod link_estimate;
pub mod metrics;
pub mod model;
pub mod reduce;
pub mod shapley;
pub mod simulate;
pub mod source;
pub mod value;

pub use builder::NetworkModelBuilder;
pub use cache::{AttributionCache, CacheStatus, Simulation};
pub use coalition::Coalition;
pub use compare::{CompareResult, OperatorDelta};
pub use config::RewardsConfig;
pub use error::{Result, RewardsError, SourceError};
pub use link_estimate::{LinkEstimateResult, LinkResult};
pub use model::{NetworkModel, NetworkSummary, Operator, OperatorValue};
pub use reduce::{CoalitionReducer, ReducedModel};
pub use shapley::{Attribution, Exactness, ShapleyComputer};
pub use simulate::Simulator;
pub use source::{EpochSource, MemorySource, SnapshotSource, TelemetrySource};
pub use value::{Game, PathValue, ValueFunction};
