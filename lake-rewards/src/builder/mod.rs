//! Assembles a [`NetworkModel`] from telemetry rows
//!
//! Required tables (devices, links) must be reachable; optional ones (metro
//! coordinates, measured latencies, traffic) degrade to estimates. Rows that
//! cannot be resolved are dropped with a warning.

mod demand;
mod latency;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{LatencyConfig, ModelConfig};
use crate::error::{Result, RewardsError};
use crate::metrics;
use crate::model::{Device, NetworkModel, Operator, PrivateLink, PublicLink};
use crate::source::{DeviceRow, LinkRow, MetroRow, TelemetrySource};

use latency::{pair_key, round_to};

/// Builds a fresh network model on every call
#[derive(Clone)]
pub struct NetworkModelBuilder {
    source: Arc<dyn TelemetrySource>,
    model: ModelConfig,
    latency: LatencyConfig,
}

impl NetworkModelBuilder {
    pub fn new(source: Arc<dyn TelemetrySource>, model: ModelConfig, latency: LatencyConfig) -> Self {
        Self {
            source,
            model,
            latency,
        }
    }

    /// Query the source and assemble the model
    pub async fn build(&self) -> Result<NetworkModel> {
        let device_rows = self.source.devices().await?;
        let link_rows = self.source.links().await?;
        let metro_rows = self.source.metros().await.unwrap_or_else(|e| {
            warn!(error = %e, "Metro metadata unavailable, public latency will use fallback");
            Vec::new()
        });

        let devices = self.resolve_devices(device_rows);
        if devices.is_empty() {
            return Err(RewardsError::EmptyTopology);
        }
        let private_links = self.resolve_links(link_rows, &devices);

        let cities: BTreeSet<String> = devices.iter().map(|d| d.city.clone()).collect();
        let public_links = self.public_links(&cities, &metro_rows).await;

        let demands = match self.source.traffic(self.model.traffic_window()).await {
            Ok(rows) => demand::from_traffic(&rows, &cities, &self.model),
            Err(e) => {
                warn!(error = %e, "Traffic aggregates unavailable");
                Vec::new()
            }
        };
        let demands = if demands.is_empty() {
            info!(
                cities = cities.len(),
                "No observed traffic between active metros, using synthetic demand"
            );
            demand::synthetic(&cities, self.model.max_synthetic_demands)
        } else {
            demands
        };

        let model = NetworkModel {
            private_links,
            devices,
            demands,
            public_links,
            operator_uptime: self.model.operator_uptime,
            contiguity_bonus: self.model.contiguity_bonus,
            demand_multiplier: self.model.demand_multiplier,
        };
        let summary = model.summary();
        debug!(
            devices = summary.device_count,
            links = summary.link_count,
            operators = summary.operator_count,
            metros = summary.metro_count,
            demands = summary.demand_count,
            "Built network model"
        );
        Ok(model)
    }

    fn resolve_devices(&self, rows: Vec<DeviceRow>) -> Vec<Device> {
        let mut seen = BTreeSet::new();
        let mut dropped = 0;
        let mut devices = Vec::with_capacity(rows.len());

        for row in rows {
            if !row.status.is_active() {
                continue;
            }
            let city = row
                .metro
                .as_deref()
                .map(|m| m.trim().to_uppercase())
                .unwrap_or_default();
            if city.is_empty() {
                warn!(device = %row.code, "Dropping device without a metro");
                dropped += 1;
                continue;
            }
            let operator = Operator::from(row.operator.trim());
            if row.operator.trim().is_empty() || operator == Operator::Public {
                warn!(device = %row.code, operator = %row.operator, "Dropping device without a usable operator");
                dropped += 1;
                continue;
            }
            if !seen.insert(row.code.clone()) {
                warn!(device = %row.code, "Dropping duplicate device");
                dropped += 1;
                continue;
            }
            devices.push(Device {
                code: row.code,
                operator,
                city,
            });
        }

        metrics::record_dropped("device", dropped);
        devices
    }

    fn resolve_links(&self, rows: Vec<LinkRow>, devices: &[Device]) -> Vec<PrivateLink> {
        let known: BTreeSet<&str> = devices.iter().map(|d| d.code.as_str()).collect();
        let mut dropped = 0;
        let mut links = Vec::with_capacity(rows.len());

        for row in rows {
            // drained links carry no capacity
            if !row.status.is_active() {
                debug!(side_a = %row.side_a, side_z = %row.side_z, status = ?row.status, "Skipping inactive link");
                continue;
            }
            if !known.contains(row.side_a.as_str()) || !known.contains(row.side_z.as_str()) {
                warn!(side_a = %row.side_a, side_z = %row.side_z, "Dropping link with unresolved endpoint");
                dropped += 1;
                continue;
            }
            let Some(rtt_ns) = row.rtt_ns.filter(|ns| *ns > 0) else {
                warn!(side_a = %row.side_a, side_z = %row.side_z, "Dropping link without measured latency");
                dropped += 1;
                continue;
            };
            links.push(PrivateLink {
                device1: row.side_a,
                device2: row.side_z,
                latency: round_to(rtt_ns as f64 / 1_000_000.0, 2),
                bandwidth: round_to(row.bandwidth_bps as f64 / 1_000_000_000.0, 1),
                uptime: self.model.default_link_uptime,
                shared: row.shared_risk_group,
            });
        }

        metrics::record_dropped("link", dropped);
        links
    }

    async fn public_links(&self, cities: &BTreeSet<String>, metros: &[MetroRow]) -> Vec<PublicLink> {
        let coords: BTreeMap<String, (f64, f64)> = metros
            .iter()
            .filter_map(|m| match (m.latitude, m.longitude) {
                (Some(lat), Some(lng)) => Some((m.code.to_uppercase(), (lat, lng))),
                _ => None,
            })
            .collect();

        let measured = match self.source.metro_latencies().await {
            Ok(rows) => latency::measured(&rows),
            Err(e) => {
                warn!(error = %e, "Measured metro latency unavailable, estimating from coordinates");
                BTreeMap::new()
            }
        };

        let cities: Vec<&String> = cities.iter().collect();
        let mut links = Vec::new();
        for (i, city1) in cities.iter().enumerate() {
            for city2 in cities.iter().skip(i + 1) {
                let latency = match measured.get(&pair_key(city1, city2)) {
                    Some(ms) => *ms,
                    None => match (coords.get(*city1), coords.get(*city2)) {
                        (Some(a), Some(b)) => latency::estimate(&self.latency, *a, *b),
                        _ => self.latency.fallback_ms,
                    },
                };
                links.push(PublicLink {
                    city1: (*city1).clone(),
                    city2: (*city2).clone(),
                    latency,
                });
            }
        }
        links
    }
}
