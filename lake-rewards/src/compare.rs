//! Side-by-side attribution of two network models

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::model::{NetworkModel, Operator, OperatorValue};
use crate::simulate::Simulator;
use crate::value::ValueFunction;

/// Change in one operator's value between two runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorDelta {
    pub operator: Operator,
    pub baseline_value: f64,
    pub modified_value: f64,
    pub value_delta: f64,
    pub baseline_proportion: f64,
    pub modified_proportion: f64,
    pub proportion_delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareResult {
    pub baseline_results: Vec<OperatorValue>,
    pub modified_results: Vec<OperatorValue>,
    /// Every operator of either run, sorted by name
    pub deltas: Vec<OperatorDelta>,
    pub baseline_total: f64,
    pub modified_total: f64,
}

impl Simulator {
    /// Attribute both models; operators missing from one side count as 0
    pub fn compare(
        &self,
        baseline: &NetworkModel,
        modified: &NetworkModel,
        value_fn: &dyn ValueFunction,
        cancel: &CancellationToken,
    ) -> Result<CompareResult> {
        let before = self.simulate(baseline, value_fn, cancel)?;
        let after = self.simulate(modified, value_fn, cancel)?;
        Ok(deltas(
            before.values,
            before.total,
            after.values,
            after.total,
        ))
    }
}

fn deltas(
    baseline_results: Vec<OperatorValue>,
    baseline_total: f64,
    modified_results: Vec<OperatorValue>,
    modified_total: f64,
) -> CompareResult {
    let index = |values: &[OperatorValue]| -> BTreeMap<String, (f64, f64)> {
        values
            .iter()
            .map(|v| (v.operator.as_str().to_string(), (v.value, v.proportion)))
            .collect()
    };
    let before = index(&baseline_results);
    let after = index(&modified_results);
    let names: BTreeSet<&String> = before.keys().chain(after.keys()).collect();

    let deltas = names
        .into_iter()
        .map(|name| {
            let (bv, bp) = before.get(name).copied().unwrap_or_default();
            let (mv, mp) = after.get(name).copied().unwrap_or_default();
            OperatorDelta {
                operator: Operator::from(name.as_str()),
                baseline_value: bv,
                modified_value: mv,
                value_delta: mv - bv,
                baseline_proportion: bp,
                modified_proportion: mp,
                proportion_delta: mp - bp,
            }
        })
        .collect();

    CompareResult {
        baseline_results,
        modified_results,
        deltas,
        baseline_total,
        modified_total,
    }
}
