//! Splits one operator's value across its own links
//!
//! Up to [`EXACT_LINK_LIMIT`] focus links, every distinct link (both
//! directions of a device pair, or every member of a shared-risk group) is a
//! player of its own and all other links belong to `Others`. Above the limit
//! each link is scored by leave-one-out: the operator's value with the full
//! network minus its value without that link.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Result, RewardsError};
use crate::model::{NetworkModel, Operator, PrivateLink};
use crate::shapley::ShapleyComputer;
use crate::simulate::Simulator;
use crate::value::{Game, ValueFunction};

/// Most focus links scored with exact Shapley values
pub const EXACT_LINK_LIMIT: usize = 15;

const OTHERS_BIT: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkResult {
    pub device1: String,
    pub device2: String,
    pub bandwidth: f64,
    pub latency: f64,
    pub value: f64,
    /// Share of the positive total
    pub percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkEstimateResult {
    pub results: Vec<LinkResult>,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum GroupKey {
    Shared(u32),
    Pair(String, String),
}

fn pair(link: &PrivateLink) -> (String, String) {
    if link.device1 <= link.device2 {
        (link.device1.clone(), link.device2.clone())
    } else {
        (link.device2.clone(), link.device1.clone())
    }
}

impl Simulator {
    /// Per-link breakdown of `operator`'s value in `model`
    pub fn estimate_links(
        &self,
        operator: &Operator,
        model: &NetworkModel,
        value_fn: &dyn ValueFunction,
        cancel: &CancellationToken,
    ) -> Result<LinkEstimateResult> {
        model.validate()?;
        let owners = model.device_owners();
        let is_focus = |link: &PrivateLink| {
            owners.get(link.device1.as_str()) == Some(&operator)
                || owners.get(link.device2.as_str()) == Some(&operator)
        };
        let focus_links = model.private_links.iter().filter(|&l| is_focus(l)).count();
        debug!(operator = %operator, links = focus_links, "Estimating per-link value");

        if focus_links == 0 {
            return Ok(LinkEstimateResult::default());
        }
        if focus_links > EXACT_LINK_LIMIT {
            return self.leave_one_out(operator, model, value_fn, cancel);
        }

        let mut groups: Vec<GroupKey> = Vec::new();
        let mut masks = Vec::with_capacity(model.private_links.len());
        for link in &model.private_links {
            if !is_focus(link) {
                masks.push(OTHERS_BIT);
                continue;
            }
            let key = match link.shared {
                Some(group) => GroupKey::Shared(group),
                None => {
                    let (a, b) = pair(link);
                    GroupKey::Pair(a, b)
                }
            };
            let index = match groups.iter().position(|g| *g == key) {
                Some(i) => i,
                None => {
                    groups.push(key);
                    groups.len() - 1
                }
            };
            let mut mask = 1u64 << (index + 1);
            let both_focus = owners.get(link.device1.as_str()) == Some(&operator)
                && owners.get(link.device2.as_str()) == Some(&operator);
            if !both_focus {
                mask |= OTHERS_BIT;
            }
            masks.push(mask);
        }

        let players: Vec<Operator> = std::iter::once(Operator::Others)
            .chain((1..=groups.len()).map(|i| Operator::contributor(format!("link-{i}"))))
            .collect();
        let mut retagged = model.clone();
        retagged.operator_uptime = 1.0;
        let game = Game::with_link_players(&retagged, players.clone(), masks, &self.value)?;
        let attribution = ShapleyComputer::new(self.shapley.clone()).compute(&game, value_fn, cancel)?;

        // one row per device pair, a shared group's value split across its pairs
        let mut rows: BTreeMap<usize, Vec<&PrivateLink>> = BTreeMap::new();
        let mut seen = Vec::new();
        for link in model.private_links.iter().filter(|&l| is_focus(l)) {
            let key = pair(link);
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            let group = match link.shared {
                Some(g) => GroupKey::Shared(g),
                None => {
                    let (a, b) = pair(link);
                    GroupKey::Pair(a, b)
                }
            };
            if let Some(index) = groups.iter().position(|g| *g == group) {
                rows.entry(index).or_default().push(link);
            }
        }

        let mut results = Vec::new();
        for (index, links) in rows {
            let value = attribution.value_of(&players[index + 1]) / links.len() as f64;
            for link in links {
                results.push(LinkResult {
                    device1: link.device1.clone(),
                    device2: link.device2.clone(),
                    bandwidth: link.bandwidth,
                    latency: link.latency,
                    value,
                    percent: 0.0,
                });
            }
        }
        Ok(with_percent(results))
    }

    fn leave_one_out(
        &self,
        operator: &Operator,
        model: &NetworkModel,
        value_fn: &dyn ValueFunction,
        cancel: &CancellationToken,
    ) -> Result<LinkEstimateResult> {
        let reducer = self.reducer().keeping(operator.clone());
        let full = self.simulate_reduced(&reducer.reduce(model.clone()), value_fn, cancel)?;
        let baseline = full.value_of(operator);

        let owners = model.device_owners();
        let mut seen = Vec::new();
        let mut results = Vec::new();
        for link in &model.private_links {
            let focus = owners.get(link.device1.as_str()) == Some(&operator)
                || owners.get(link.device2.as_str()) == Some(&operator);
            let key = pair(link);
            if !focus || seen.contains(&key) {
                continue;
            }

            let mut without = model.clone();
            without.private_links.retain(|l| pair(l) != key);
            let value = match self.simulate_reduced(&reducer.reduce(without), value_fn, cancel) {
                Ok(reduced) => (baseline - reduced.value_of(operator)).max(0.0),
                Err(RewardsError::Cancelled) => return Err(RewardsError::Cancelled),
                Err(e) => {
                    warn!(device1 = %link.device1, device2 = %link.device2, error = %e, "Link removal run failed, scoring it 0");
                    0.0
                }
            };
            seen.push(key);
            results.push(LinkResult {
                device1: link.device1.clone(),
                device2: link.device2.clone(),
                bandwidth: link.bandwidth,
                latency: link.latency,
                value,
                percent: 0.0,
            });
        }
        Ok(with_percent(results))
    }
}

fn with_percent(mut results: Vec<LinkResult>) -> LinkEstimateResult {
    let total_value: f64 = results.iter().map(|r| r.value.max(0.0)).sum();
    if total_value > 0.0 {
        for r in &mut results {
            r.percent = r.value.max(0.0) / total_value;
        }
    }
    LinkEstimateResult {
        results,
        total_value,
    }
}
