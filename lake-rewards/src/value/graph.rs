//! Compiled routing graph and least-cost path search
//!
//! Cities are nodes. Public edges are always usable; a private edge is usable
//! when the coalition intersects its player mask. Costs are additive
//! (`-ln` of the path quality), so Dijkstra finds the best path exactly.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::coalition::Coalition;
use crate::config::ValueConfig;
use crate::model::{NetworkModel, Operator};

const PUBLIC_CARRIER: usize = 0;

#[derive(Debug, Clone)]
struct PrivateEdge {
    a: usize,
    b: usize,
    /// Ground-truth owner index of the device at each end
    owner_a: usize,
    owner_b: usize,
    cost: f64,
    players: u64,
}

impl PrivateEdge {
    fn single_owner(&self) -> Option<usize> {
        (self.owner_a == self.owner_b).then_some(self.owner_a)
    }
}

#[derive(Debug, Clone, Copy)]
struct DemandTarget {
    to: usize,
    weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    cost: f64,
    node: usize,
}

impl Eq for Entry {}

impl Ord for Entry {
    // reversed for a min-heap; lower index wins ties
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Routing view of a [`NetworkModel`] for one player assignment
#[derive(Debug, Clone)]
pub(crate) struct RoutingGraph {
    city_count: usize,
    owner_count: usize,
    /// city -> (neighbour, cost)
    public_adj: Vec<Vec<(usize, f64)>>,
    /// city -> private edge indices touching it
    private_adj: Vec<Vec<usize>>,
    edges: Vec<PrivateEdge>,
    /// owner -> indices of edges with that owner at both ends
    owner_edges: Vec<Vec<usize>>,
    /// demands grouped by source city
    demands: BTreeMap<usize, Vec<DemandTarget>>,
    operator_charge: f64,
    contiguity_credit: f64,
    demand_multiplier: f64,
}

impl RoutingGraph {
    /// `link_players[i]` is the player mask that unlocks private link `i`
    pub(crate) fn compile(model: &NetworkModel, link_players: &[u64], config: &ValueConfig) -> Self {
        let scale = config.latency_scale_ms;
        let hop = config.hop_penalty_ms / scale;

        let mut cities: BTreeMap<&str, usize> = BTreeMap::new();
        let names = model
            .devices
            .iter()
            .map(|d| d.city.as_str())
            .chain(
                model
                    .public_links
                    .iter()
                    .flat_map(|l| [l.city1.as_str(), l.city2.as_str()]),
            )
            .chain(
                model
                    .demands
                    .iter()
                    .flat_map(|d| [d.start.as_str(), d.end.as_str()]),
            );
        for name in names {
            let next = cities.len();
            cities.entry(name).or_insert(next);
        }
        let city_count = cities.len();

        let owners: BTreeMap<&Operator, usize> = model
            .devices
            .iter()
            .map(|d| &d.operator)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .enumerate()
            .map(|(i, op)| (op, i))
            .collect();
        let owner_count = owners.len();
        let device_at: BTreeMap<&str, (usize, usize)> = model
            .devices
            .iter()
            .filter_map(|d| Some((d.code.as_str(), (cities[d.city.as_str()], *owners.get(&d.operator)?))))
            .collect();

        let mut public_adj = vec![Vec::new(); city_count];
        for link in &model.public_links {
            let (a, b) = (cities[link.city1.as_str()], cities[link.city2.as_str()]);
            if a == b || !(link.latency.is_finite() && link.latency >= 0.0) {
                continue;
            }
            let cost = link.latency / scale + hop;
            public_adj[a].push((b, cost));
            public_adj[b].push((a, cost));
        }

        let mut edges = Vec::new();
        let mut private_adj = vec![Vec::new(); city_count];
        let mut owner_edges = vec![Vec::new(); owner_count];
        for (link, players) in model.private_links.iter().zip(link_players) {
            let (Some(&(a, owner_a)), Some(&(b, owner_b))) = (
                device_at.get(link.device1.as_str()),
                device_at.get(link.device2.as_str()),
            ) else {
                continue;
            };
            if a == b || link.uptime <= 0.0 || !link.latency.is_finite() || link.latency < 0.0 {
                continue;
            }
            let edge = PrivateEdge {
                a,
                b,
                owner_a,
                owner_b,
                cost: link.latency / scale + hop - link.uptime.min(1.0).ln(),
                players: *players,
            };
            let index = edges.len();
            private_adj[a].push(index);
            private_adj[b].push(index);
            if let Some(owner) = edge.single_owner() {
                owner_edges[owner].push(index);
            }
            edges.push(edge);
        }

        let mut demands: BTreeMap<usize, Vec<DemandTarget>> = BTreeMap::new();
        for demand in &model.demands {
            let weight = demand.weight();
            if !(weight.is_finite() && weight > 0.0) {
                continue;
            }
            demands
                .entry(cities[demand.start.as_str()])
                .or_default()
                .push(DemandTarget {
                    to: cities[demand.end.as_str()],
                    weight,
                });
        }

        Self {
            city_count,
            owner_count,
            public_adj,
            private_adj,
            edges,
            owner_edges,
            demands,
            operator_charge: -model.operator_uptime.clamp(f64::MIN_POSITIVE, 1.0).ln(),
            contiguity_credit: model.contiguity_bonus.max(0.0) / scale,
            demand_multiplier: model.demand_multiplier,
        }
    }

    /// Total realized demand value for a coalition
    pub(crate) fn value(&self, coalition: Coalition) -> f64 {
        let mut total = 0.0;
        for (&source, demands) in &self.demands {
            let best = self.best_costs(source, coalition);
            let contiguous: Vec<Vec<f64>> = (0..self.owner_count)
                .map(|owner| self.contiguous_costs(source, owner, coalition))
                .collect();

            for demand in demands {
                let mut quality = path_quality(best[demand.to]);
                for costs in &contiguous {
                    if costs.is_empty() {
                        continue;
                    }
                    let candidate = path_quality(costs[demand.to] + self.operator_charge - self.contiguity_credit);
                    if candidate > quality {
                        quality = candidate;
                    }
                }
                total += demand.weight * self.demand_multiplier * quality;
            }
        }
        total
    }

    /// Least cost from `source` to every city over the (city, carrier) graph
    fn best_costs(&self, source: usize, coalition: Coalition) -> Vec<f64> {
        let carriers = self.owner_count + 1;
        let state = |city: usize, carrier: usize| city * carriers + carrier;
        let mut dist = vec![f64::INFINITY; self.city_count * carriers];
        let mut heap = BinaryHeap::new();

        dist[state(source, PUBLIC_CARRIER)] = 0.0;
        heap.push(Entry {
            cost: 0.0,
            node: state(source, PUBLIC_CARRIER),
        });

        while let Some(Entry { cost, node }) = heap.pop() {
            if cost > dist[node] {
                continue;
            }
            let (city, carrier) = (node / carriers, node % carriers);
            let mut relax = |next: usize, step: f64, heap: &mut BinaryHeap<Entry>| {
                let candidate = cost + step;
                if candidate < dist[next] {
                    dist[next] = candidate;
                    heap.push(Entry {
                        cost: candidate,
                        node: next,
                    });
                }
            };

            for &(neighbour, step) in &self.public_adj[city] {
                relax(state(neighbour, PUBLIC_CARRIER), step, &mut heap);
            }
            for &index in &self.private_adj[city] {
                let edge = &self.edges[index];
                if !coalition.intersects(edge.players) {
                    continue;
                }
                let (to, from_owner, to_owner) = if edge.a == city {
                    (edge.b, edge.owner_a, edge.owner_b)
                } else {
                    (edge.a, edge.owner_b, edge.owner_a)
                };
                let mut step = edge.cost;
                if carrier != from_owner + 1 {
                    step += self.operator_charge;
                }
                if to_owner != from_owner {
                    step += self.operator_charge;
                }
                relax(state(to, to_owner + 1), step, &mut heap);
            }
        }

        (0..self.city_count)
            .map(|city| {
                (0..carriers)
                    .map(|carrier| dist[state(city, carrier)])
                    .fold(f64::INFINITY, f64::min)
            })
            .collect()
    }

    /// Least cost using only one owner's internal links, empty when none usable
    fn contiguous_costs(&self, source: usize, owner: usize, coalition: Coalition) -> Vec<f64> {
        let touches_source = self.owner_edges[owner].iter().any(|&i| {
            let edge = &self.edges[i];
            (edge.a == source || edge.b == source) && coalition.intersects(edge.players)
        });
        if !touches_source {
            return Vec::new();
        }

        let mut dist = vec![f64::INFINITY; self.city_count];
        let mut heap = BinaryHeap::new();
        dist[source] = 0.0;
        heap.push(Entry {
            cost: 0.0,
            node: source,
        });

        while let Some(Entry { cost, node }) = heap.pop() {
            if cost > dist[node] {
                continue;
            }
            for &index in &self.private_adj[node] {
                let edge = &self.edges[index];
                if edge.single_owner() != Some(owner) || !coalition.intersects(edge.players) {
                    continue;
                }
                let next = if edge.a == node { edge.b } else { edge.a };
                let candidate = cost + edge.cost;
                if candidate < dist[next] {
                    dist[next] = candidate;
                    heap.push(Entry {
                        cost: candidate,
                        node: next,
                    });
                }
            }
        }
        // the source itself is not a private path
        dist[source] = f64::INFINITY;
        dist
    }
}

fn path_quality(cost: f64) -> f64 {
    if cost.is_finite() { (-cost).exp() } else { 0.0 }
}
