//! Reduce, compile and attribute one network model

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{RewardsConfig, ShapleyConfig, ValueConfig};
use crate::error::Result;
use crate::model::NetworkModel;
use crate::reduce::{CoalitionReducer, ReducedModel};
use crate::shapley::{Attribution, ShapleyComputer};
use crate::value::{Game, ValueFunction};

/// Runs the attribution pipeline with fixed settings
#[derive(Debug, Clone)]
pub struct Simulator {
    pub(crate) value: ValueConfig,
    pub(crate) shapley: ShapleyConfig,
}

impl Simulator {
    pub fn new(config: &RewardsConfig) -> Self {
        Self {
            value: config.value.clone(),
            shapley: config.shapley.clone(),
        }
    }

    pub(crate) fn reducer(&self) -> CoalitionReducer {
        CoalitionReducer::new(self.shapley.collapse_threshold)
    }

    /// Collapse small operators, then compute every player's share
    pub fn simulate(
        &self,
        model: &NetworkModel,
        value_fn: &dyn ValueFunction,
        cancel: &CancellationToken,
    ) -> Result<Attribution> {
        let reduced = self.reducer().reduce(model.clone());
        self.simulate_reduced(&reduced, value_fn, cancel)
    }

    pub fn simulate_reduced(
        &self,
        reduced: &ReducedModel,
        value_fn: &dyn ValueFunction,
        cancel: &CancellationToken,
    ) -> Result<Attribution> {
        let game = Game::new(reduced, &self.value)?;
        debug!(
            players = game.player_count(),
            collapsed = reduced.collapsed().len(),
            "Attributing network value"
        );
        ShapleyComputer::new(self.shapley.clone()).compute(&game, value_fn, cancel)
    }
}
