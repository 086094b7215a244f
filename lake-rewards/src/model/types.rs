//! Network model types

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::compat;
use crate::error::{Result, RewardsError};

const PUBLIC: &str = "Public";
const PRIVATE: &str = "Private";
const OTHERS: &str = "Others";

/// A coalition player
///
/// Serialized as a plain string; the three pseudo-player names are reserved.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    /// Public internet baseline, present in every coalition
    Public,
    /// Aggregate of the permissioned backbone
    Private,
    /// Collapsed low-impact contributors
    Others,
    /// A real infrastructure contributor, by code
    Contributor(String),
}

impl Operator {
    pub fn contributor(code: impl Into<String>) -> Self {
        Self::from(code.into())
    }

    pub fn is_pseudo(&self) -> bool {
        !matches!(self, Self::Contributor(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Public => PUBLIC,
            Self::Private => PRIVATE,
            Self::Others => OTHERS,
            Self::Contributor(code) => code,
        }
    }
}

impl From<String> for Operator {
    fn from(code: String) -> Self {
        match code.as_str() {
            PUBLIC => Self::Public,
            PRIVATE => Self::Private,
            OTHERS => Self::Others,
            _ => Self::Contributor(code),
        }
    }
}

impl From<&str> for Operator {
    fn from(code: &str) -> Self {
        Self::from(code.to_string())
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Contributor(code) => code,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A network element owned by one operator at one city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(rename = "device")]
    pub code: String,
    pub operator: Operator,
    pub city: String,
}

/// A private edge between two devices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateLink {
    pub device1: String,
    pub device2: String,
    /// Milliseconds, from measured round-trip time
    pub latency: f64,
    /// Gbps
    #[serde(default)]
    pub bandwidth: f64,
    /// Probability the link is up
    pub uptime: f64,
    /// Shared-risk group; links in one group fail together
    #[serde(default, with = "compat::shared_group")]
    pub shared: Option<u32>,
}

/// Public-internet reachability between two cities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicLink {
    pub city1: String,
    pub city2: String,
    pub latency: f64,
}

/// Directed traffic requirement between two cities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demand {
    pub start: String,
    pub end: String,
    pub receivers: u32,
    /// Normalized traffic weight
    pub traffic: f64,
    pub priority: f64,
    #[serde(default, deserialize_with = "compat::flag")]
    pub multicast: bool,
}

impl Demand {
    /// Traffic scaled by priority and, for multicast, by fan-out
    pub fn weight(&self) -> f64 {
        let fan_out = if self.multicast {
            f64::from(self.receivers.max(1))
        } else {
            1.0
        };
        self.traffic * self.priority * fan_out
    }
}

/// Everything the value function needs for one refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkModel {
    pub private_links: Vec<PrivateLink>,
    pub devices: Vec<Device>,
    pub demands: Vec<Demand>,
    pub public_links: Vec<PublicLink>,
    pub operator_uptime: f64,
    pub contiguity_bonus: f64,
    pub demand_multiplier: f64,
}

impl NetworkModel {
    /// Check that every link endpoint resolves to a device and that demand
    /// scaling keeps values non-negative
    pub fn validate(&self) -> Result<()> {
        if !self.demand_multiplier.is_finite() || self.demand_multiplier < 0.0 {
            return Err(RewardsError::InvalidModel(format!(
                "demand_multiplier must be finite and not negative, got {}",
                self.demand_multiplier
            )));
        }
        let devices: BTreeSet<&str> = self.devices.iter().map(|d| d.code.as_str()).collect();
        if devices.len() != self.devices.len() {
            return Err(RewardsError::InvalidModel("duplicate device code".into()));
        }
        if let Some(device) = self.devices.iter().find(|d| d.operator == Operator::Public) {
            return Err(RewardsError::InvalidModel(format!(
                "device {} is owned by the Public pseudo-player",
                device.code
            )));
        }
        for link in &self.private_links {
            for end in [&link.device1, &link.device2] {
                if !devices.contains(end.as_str()) {
                    return Err(RewardsError::InvalidModel(format!(
                        "link {}-{} references unknown device {}",
                        link.device1, link.device2, end
                    )));
                }
            }
        }
        Ok(())
    }

    /// Distinct owning operators, sorted
    pub fn operators(&self) -> Vec<Operator> {
        let ops: BTreeSet<&Operator> = self.devices.iter().map(|d| &d.operator).collect();
        ops.into_iter().cloned().collect()
    }

    /// Device count per owning operator
    pub fn device_counts(&self) -> BTreeMap<Operator, usize> {
        let mut counts = BTreeMap::new();
        for device in &self.devices {
            *counts.entry(device.operator.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Owner of every device, by code
    pub fn device_owners(&self) -> BTreeMap<&str, &Operator> {
        self.devices
            .iter()
            .map(|d| (d.code.as_str(), &d.operator))
            .collect()
    }

    /// Diagnostic counts
    pub fn summary(&self) -> NetworkSummary {
        let cities: BTreeSet<&str> = self.devices.iter().map(|d| d.city.as_str()).collect();
        NetworkSummary {
            device_count: self.devices.len(),
            link_count: self.private_links.len(),
            operator_count: self.operators().len(),
            metro_count: cities.len(),
            demand_count: self.demands.len(),
        }
    }
}

/// Counts describing the last built network
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub device_count: usize,
    pub link_count: usize,
    pub operator_count: usize,
    pub metro_count: usize,
    pub demand_count: usize,
}

/// An operator's attributed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorValue {
    pub operator: Operator,
    pub value: f64,
    /// Share of the total, 0 when the total is 0
    pub proportion: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_pseudo_names_round_trip() {
        assert_eq!(Operator::from("Public"), Operator::Public);
        assert_eq!(Operator::from("Others"), Operator::Others);
        assert_eq!(Operator::from("Private"), Operator::Private);
        assert_eq!(
            Operator::from("jump"),
            Operator::Contributor("jump".to_string())
        );
        assert_eq!(String::from(Operator::Others), "Others");
        assert!(Operator::Others.is_pseudo());
        assert!(!Operator::contributor("jump").is_pseudo());
    }

    #[test]
    fn test_parses_snapshot_json() {
        let json = r#"{
            "private_links": [
                {"device1": "nyc1", "device2": "lon1", "latency": 20.0, "bandwidth": 10.0, "uptime": 0.99, "shared": "NA"},
                {"device1": "lon1", "device2": "nyc1", "latency": 20.0, "bandwidth": 10.0, "uptime": 0.99, "shared": "2"}
            ],
            "devices": [
                {"device": "nyc1", "edge": 10, "operator": "alpha", "city": "NYC"},
                {"device": "lon1", "edge": 10, "operator": "alpha", "city": "LON"}
            ],
            "demands": [
                {"start": "NYC", "end": "LON", "receivers": 3, "traffic": 0.5, "priority": 1.0, "type": 1, "multicast": "TRUE"}
            ],
            "public_links": [{"city1": "LON", "city2": "NYC", "latency": 80.0}],
            "operator_uptime": 0.98,
            "contiguity_bonus": 5.0,
            "demand_multiplier": 1.0
        }"#;
        let model: NetworkModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.private_links[0].shared, None);
        assert_eq!(model.private_links[1].shared, Some(2));
        assert!(model.demands[0].multicast);
        assert_eq!(model.demands[0].weight(), 1.5);
        assert!(model.validate().is_ok());
        assert_eq!(model.summary().metro_count, 2);
        assert_eq!(model.summary().operator_count, 1);
    }

    #[test]
    fn test_validate_rejects_dangling_link() {
        let model = NetworkModel {
            private_links: vec![PrivateLink {
                device1: "a".into(),
                device2: "missing".into(),
                latency: 1.0,
                bandwidth: 1.0,
                uptime: 1.0,
                shared: None,
            }],
            devices: vec![Device {
                code: "a".into(),
                operator: Operator::contributor("alpha"),
                city: "NYC".into(),
            }],
            demands: vec![],
            public_links: vec![],
            operator_uptime: 1.0,
            contiguity_bonus: 0.0,
            demand_multiplier: 1.0,
        };
        let err = model.validate().unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_validate_rejects_negative_multiplier() {
        let model = NetworkModel {
            private_links: vec![],
            devices: vec![],
            demands: vec![],
            public_links: vec![],
            operator_uptime: 1.0,
            contiguity_bonus: 0.0,
            demand_multiplier: -1.0,
        };
        let err = model.validate().unwrap_err();
        assert!(matches!(err, RewardsError::InvalidModel(_)));

        let nan = NetworkModel {
            demand_multiplier: f64::NAN,
            ..model
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_unicast_weight_ignores_receivers() {
        let demand = Demand {
            start: "A".into(),
            end: "B".into(),
            receivers: 40,
            traffic: 0.5,
            priority: 2.0,
            multicast: false,
        };
        assert_eq!(demand.weight(), 1.0);
    }
}
