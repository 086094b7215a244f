//! Coalition value functions
//!
//! A [`Game`] fixes the players and compiles the model into a routing graph
//! once; a [`ValueFunction`] then scores any [`Coalition`] of those players.

mod graph;

use std::collections::BTreeMap;

use crate::coalition::{Coalition, MAX_PLAYERS};
use crate::config::ValueConfig;
use crate::error::{Result, RewardsError};
use crate::model::{NetworkModel, Operator};
use crate::reduce::ReducedModel;

use graph::RoutingGraph;

/// Scores a coalition of a [`Game`]'s players
///
/// Implementations must be pure and monotone: adding a player never lowers
/// the value.
pub trait ValueFunction: Send + Sync {
    fn value(&self, game: &Game, coalition: Coalition) -> f64;
}

/// Best-path demand value over public and coalition-owned private links
#[derive(Debug, Clone, Copy, Default)]
pub struct PathValue;

impl ValueFunction for PathValue {
    fn value(&self, game: &Game, coalition: Coalition) -> f64 {
        game.graph.value(coalition)
    }
}

/// A cooperative game over one network model
#[derive(Debug, Clone)]
pub struct Game {
    players: Vec<Operator>,
    graph: RoutingGraph,
}

impl Game {
    /// Players are the reduced operators; each link is unlocked by the
    /// players of its two endpoint owners
    pub fn new(reduced: &ReducedModel, config: &ValueConfig) -> Result<Self> {
        let model = reduced.model();
        model.validate()?;

        let players = reduced.players().to_vec();
        let index: BTreeMap<&Operator, usize> =
            players.iter().enumerate().map(|(i, op)| (op, i)).collect();
        let owners = model.device_owners();

        let mut masks = Vec::with_capacity(model.private_links.len());
        for link in &model.private_links {
            let mut mask = 0u64;
            for end in [&link.device1, &link.device2] {
                let owner = owners.get(end.as_str()).ok_or_else(|| {
                    RewardsError::InvalidModel(format!("unknown device {end}"))
                })?;
                if let Some(&i) = index.get(reduced.player_of(owner)) {
                    mask |= 1 << i;
                }
            }
            masks.push(mask);
        }

        Self::with_link_players(model, players, masks, config)
    }

    /// Game with an explicit player mask per private link
    pub(crate) fn with_link_players(
        model: &NetworkModel,
        players: Vec<Operator>,
        link_players: Vec<u64>,
        config: &ValueConfig,
    ) -> Result<Self> {
        if players.len() > MAX_PLAYERS {
            return Err(RewardsError::PlayerCountTooLarge {
                players: players.len(),
                ceiling: MAX_PLAYERS,
            });
        }
        if link_players.len() != model.private_links.len() {
            return Err(RewardsError::InvalidModel(format!(
                "{} player masks for {} links",
                link_players.len(),
                model.private_links.len()
            )));
        }
        Ok(Self {
            graph: RoutingGraph::compile(model, &link_players, config),
            players,
        })
    }

    pub fn players(&self) -> &[Operator] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Every player together
    pub fn grand(&self) -> Coalition {
        Coalition::grand(self.players.len())
    }

    /// Index of a player, if present
    pub fn player_index(&self, operator: &Operator) -> Option<usize> {
        self.players.iter().position(|p| p == operator)
    }
}
