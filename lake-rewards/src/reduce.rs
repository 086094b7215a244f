//! Collapses low-impact operators into the `Others` pseudo-player
//!
//! Reduction only changes who counts as a player. The ground-truth owner of
//! every device and link is kept, so the value of the grand coalition is the
//! same before and after.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::model::{NetworkModel, Operator};

/// A model together with its owner-to-player mapping
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedModel {
    model: NetworkModel,
    players: Vec<Operator>,
    assignment: BTreeMap<Operator, Operator>,
    collapsed: Vec<Operator>,
}

impl ReducedModel {
    /// Every owner is its own player
    pub fn identity(model: NetworkModel) -> Self {
        CoalitionReducer::new(0).reduce(model)
    }

    pub fn model(&self) -> &NetworkModel {
        &self.model
    }

    pub fn into_model(self) -> NetworkModel {
        self.model
    }

    /// Players, sorted, pseudo-players first
    pub fn players(&self) -> &[Operator] {
        &self.players
    }

    /// Contributors folded into `Others`
    pub fn collapsed(&self) -> &[Operator] {
        &self.collapsed
    }

    /// Player standing in for a ground-truth owner
    pub fn player_of<'a>(&'a self, owner: &'a Operator) -> &'a Operator {
        self.assignment.get(owner).unwrap_or(owner)
    }
}

/// Maps operators below a device-count threshold into `Others`
#[derive(Debug, Clone)]
pub struct CoalitionReducer {
    threshold: usize,
    keep: BTreeSet<Operator>,
}

impl CoalitionReducer {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            keep: BTreeSet::new(),
        }
    }

    /// Never collapse `operator`, whatever its size
    #[must_use]
    pub fn keeping(mut self, operator: Operator) -> Self {
        self.keep.insert(operator);
        self
    }

    pub fn reduce(&self, model: NetworkModel) -> ReducedModel {
        let counts = model.device_counts();
        let mut assignment = BTreeMap::new();
        let mut collapsed = Vec::new();

        for (owner, count) in &counts {
            let player = match owner {
                Operator::Contributor(_) if *count < self.threshold && !self.keep.contains(owner) => {
                    collapsed.push(owner.clone());
                    Operator::Others
                }
                _ => owner.clone(),
            };
            assignment.insert(owner.clone(), player);
        }

        let players: Vec<Operator> = assignment
            .values()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if !collapsed.is_empty() {
            debug!(
                collapsed = collapsed.len(),
                players = players.len(),
                threshold = self.threshold,
                "Collapsed small operators into Others"
            );
        }

        ReducedModel {
            model,
            players,
            assignment,
            collapsed,
        }
    }
}
