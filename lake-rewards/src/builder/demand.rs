//! Demand derivation from observed traffic

use std::collections::{BTreeMap, BTreeSet};

use crate::config::ModelConfig;
use crate::model::Demand;
use crate::source::TrafficRow;

const MAX_RECEIVERS: f64 = 100.0;

/// Demands weighted by byte volume relative to the busiest pair
///
/// Pairs outside `cities` and self-pairs are ignored. The heaviest
/// `max_demands` pairs are kept, ties broken by pair order.
pub(crate) fn from_traffic(
    rows: &[TrafficRow],
    cities: &BTreeSet<String>,
    config: &ModelConfig,
) -> Vec<Demand> {
    let mut volumes: BTreeMap<(String, String), u64> = BTreeMap::new();
    for row in rows {
        let origin = row.origin.to_uppercase();
        let target = row.target.to_uppercase();
        if origin == target || !cities.contains(&origin) || !cities.contains(&target) {
            continue;
        }
        *volumes.entry((origin, target)).or_insert(0) += row.bytes;
    }

    let mut pairs: Vec<((String, String), u64)> = volumes.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    pairs.truncate(config.max_demands);

    let max = pairs.first().map(|(_, bytes)| *bytes).unwrap_or(0);
    pairs
        .into_iter()
        .map(|((start, end), bytes)| {
            let normalized = if max == 0 {
                0.0
            } else {
                bytes as f64 / max as f64
            };
            let traffic = normalized.max(config.min_demand_weight);
            Demand {
                start,
                end,
                receivers: receivers_for(traffic),
                traffic,
                priority: 1.0,
                multicast: false,
            }
        })
        .collect()
}

/// Uniform demands over distinct city pairs, capped at `max`
pub(crate) fn synthetic(cities: &BTreeSet<String>, max: usize) -> Vec<Demand> {
    let cities: Vec<&String> = cities.iter().collect();
    let mut demands = Vec::new();
    for (i, start) in cities.iter().enumerate() {
        for end in cities.iter().skip(i + 1) {
            if demands.len() >= max {
                return demands;
            }
            demands.push(Demand {
                start: (*start).clone(),
                end: (*end).clone(),
                receivers: MAX_RECEIVERS as u32,
                traffic: 1.0,
                priority: 1.0,
                multicast: false,
            });
        }
    }
    demands
}

fn receivers_for(traffic: f64) -> u32 {
    (traffic * MAX_RECEIVERS).round().clamp(1.0, MAX_RECEIVERS) as u32
}
