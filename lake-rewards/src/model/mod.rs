//! Network model: devices, private and public links, demands

mod compat;
mod types;

pub use types::{
    Demand, Device, NetworkModel, NetworkSummary, Operator, OperatorValue, PrivateLink,
    PublicLink,
};
