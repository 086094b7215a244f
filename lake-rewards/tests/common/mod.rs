//! Shared fixtures for integration tests

#![allow(dead_code)]

use lake_rewards::model::{Demand, Device, PrivateLink, PublicLink};
use lake_rewards::source::{DeviceRow, LinkRow, MetroRow, Status};
use lake_rewards::{MemorySource, NetworkModel, Operator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn device(code: &str, operator: &str, city: &str) -> Device {
    Device {
        code: code.into(),
        operator: Operator::from(operator),
        city: city.into(),
    }
}

pub fn link(device1: &str, device2: &str, latency: f64, uptime: f64) -> PrivateLink {
    PrivateLink {
        device1: device1.into(),
        device2: device2.into(),
        latency,
        bandwidth: 10.0,
        uptime,
        shared: None,
    }
}

pub fn public(city1: &str, city2: &str, latency: f64) -> PublicLink {
    PublicLink {
        city1: city1.into(),
        city2: city2.into(),
        latency,
    }
}

pub fn demand(start: &str, end: &str, traffic: f64) -> Demand {
    Demand {
        start: start.into(),
        end: end.into(),
        receivers: 1,
        traffic,
        priority: 1.0,
        multicast: false,
    }
}

pub fn empty_model() -> NetworkModel {
    NetworkModel {
        private_links: vec![],
        devices: vec![],
        demands: vec![],
        public_links: vec![],
        operator_uptime: 0.98,
        contiguity_bonus: 5.0,
        demand_multiplier: 1.0,
    }
}

/// A (NYC-LON) and B (LON-PAR), public NYC-PAR at 150ms, one NYC->PAR demand
pub fn two_hop_chain() -> NetworkModel {
    NetworkModel {
        devices: vec![
            device("a-nyc", "A", "NYC"),
            device("a-lon", "A", "LON"),
            device("b-lon", "B", "LON"),
            device("b-par", "B", "PAR"),
        ],
        private_links: vec![
            link("a-nyc", "a-lon", 20.0, 0.99),
            link("b-lon", "b-par", 10.0, 0.99),
        ],
        public_links: vec![public("NYC", "PAR", 150.0)],
        demands: vec![demand("NYC", "PAR", 1.0)],
        ..empty_model()
    }
}

/// Random connected-ish network with `operators` owners over `cities` metros
pub fn random_model(seed: u64, operators: usize, cities: usize) -> NetworkModel {
    let mut rng = StdRng::seed_from_u64(seed);
    let city = |i: usize| format!("C{i:02}");
    let mut model = empty_model();

    for op in 0..operators {
        let devices = rng.gen_range(2..=4);
        for d in 0..devices {
            model.devices.push(device(
                &format!("op{op}-d{d}"),
                &format!("op{op}"),
                &city(rng.gen_range(0..cities)),
            ));
        }
    }
    for _ in 0..operators * 2 {
        let a = rng.gen_range(0..model.devices.len());
        let b = rng.gen_range(0..model.devices.len());
        if a == b {
            continue;
        }
        let (d1, d2) = (model.devices[a].code.clone(), model.devices[b].code.clone());
        model.private_links.push(link(
            &d1,
            &d2,
            rng.gen_range(1.0..60.0),
            rng.gen_range(0.9..1.0),
        ));
    }
    for i in 0..cities {
        for j in i + 1..cities {
            if rng.gen_bool(0.6) {
                model.public_links.push(public(&city(i), &city(j), rng.gen_range(30.0..250.0)));
            }
        }
    }
    for _ in 0..cities {
        let (i, j) = (rng.gen_range(0..cities), rng.gen_range(0..cities));
        if i != j {
            model.demands.push(demand(&city(i), &city(j), rng.gen_range(0.01..1.0)));
        }
    }
    model
}

pub fn device_row(code: &str, operator: &str, metro: &str) -> DeviceRow {
    DeviceRow {
        code: code.into(),
        operator: operator.into(),
        metro: Some(metro.into()),
        status: Status::Activated,
    }
}

pub fn link_row(side_a: &str, side_z: &str, rtt_ms: u64) -> LinkRow {
    LinkRow {
        side_a: side_a.into(),
        side_z: side_z.into(),
        rtt_ns: Some(rtt_ms * 1_000_000),
        bandwidth_bps: 10_000_000_000,
        status: Status::Activated,
        shared_risk_group: None,
    }
}

/// Telemetry for the two-hop chain at epoch 1
pub fn chain_source() -> MemorySource {
    let metro = |code: &str, lat: f64, lng: f64| MetroRow {
        code: code.into(),
        latitude: Some(lat),
        longitude: Some(lng),
    };
    MemorySource::new()
        .with_devices(vec![
            device_row("a-nyc", "A", "NYC"),
            device_row("a-lon", "A", "LON"),
            device_row("b-lon", "B", "LON"),
            device_row("b-par", "B", "PAR"),
        ])
        .with_links(vec![link_row("a-nyc", "a-lon", 20), link_row("b-lon", "b-par", 10)])
        .with_metros(vec![
            metro("NYC", 40.7128, -74.0060),
            metro("LON", 51.5074, -0.1278),
            metro("PAR", 48.8566, 2.3522),
        ])
        .with_epoch(1)
}
