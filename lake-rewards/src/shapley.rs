//! Shapley value computation over a [`Game`]
//!
//! Small games enumerate every coalition once into a table (in parallel) and
//! read marginals from it. Larger games, up to the configured ceiling, sample
//! random join orders with a fixed seed. Both report `v(∅)` against the
//! `Public` pseudo-player so the entries sum to `v(N)`.

use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::coalition::Coalition;
use crate::config::ShapleyConfig;
use crate::error::{Result, RewardsError};
use crate::model::{Operator, OperatorValue};
use crate::value::{Game, ValueFunction};

/// How an [`Attribution`] was computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Exactness {
    Exact,
    Approximate { samples: usize },
}

impl Exactness {
    pub fn is_exact(self) -> bool {
        matches!(self, Self::Exact)
    }
}

/// Per-operator values of one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    /// `Public` first, carrying `v(∅)`, then every player
    pub values: Vec<OperatorValue>,
    /// `v(N)`
    pub total: f64,
    pub exactness: Exactness,
}

impl Attribution {
    /// Value attributed to an operator, 0 when absent
    pub fn value_of(&self, operator: &Operator) -> f64 {
        self.values
            .iter()
            .find(|v| &v.operator == operator)
            .map(|v| v.value)
            .unwrap_or(0.0)
    }

    /// `v(∅)`, the public-internet baseline
    pub fn baseline(&self) -> f64 {
        self.value_of(&Operator::Public)
    }
}

/// Computes Shapley values within the configured player ceiling
#[derive(Debug, Clone)]
pub struct ShapleyComputer {
    config: ShapleyConfig,
}

impl ShapleyComputer {
    pub fn new(config: ShapleyConfig) -> Self {
        Self { config }
    }

    /// Attribute `v(N)` across the game's players
    ///
    /// The token is checked between value evaluations; a cancelled
    /// computation returns [`RewardsError::Cancelled`].
    pub fn compute(
        &self,
        game: &Game,
        value_fn: &dyn ValueFunction,
        cancel: &CancellationToken,
    ) -> Result<Attribution> {
        let n = game.player_count();
        if n > self.config.max_players {
            return Err(RewardsError::PlayerCountTooLarge {
                players: n,
                ceiling: self.config.max_players,
            });
        }
        if cancel.is_cancelled() {
            return Err(RewardsError::Cancelled);
        }

        let (baseline, total, phi, exactness) = if n <= self.config.max_exact_players {
            debug!(players = n, coalitions = 1u64 << n, "Computing exact Shapley values");
            let (baseline, total, phi) = exact(game, value_fn, cancel)?;
            (baseline, total, phi, Exactness::Exact)
        } else {
            let samples = self.config.samples;
            debug!(players = n, samples, "Sampling Shapley values");
            let (baseline, total, phi) = sampled(game, value_fn, cancel, samples, self.config.seed)?;
            (baseline, total, phi, Exactness::Approximate { samples })
        };

        let proportion = |value: f64| if total == 0.0 { 0.0 } else { value / total };
        let mut values = Vec::with_capacity(n + 1);
        values.push(OperatorValue {
            operator: Operator::Public,
            value: baseline,
            proportion: proportion(baseline),
        });
        for (operator, value) in game.players().iter().zip(phi) {
            values.push(OperatorValue {
                operator: operator.clone(),
                value,
                proportion: proportion(value),
            });
        }

        let attribution = Attribution {
            values,
            total,
            exactness,
        };
        check_efficiency(&attribution, self.config.tolerance)?;
        Ok(attribution)
    }
}

/// Fail unless the values sum to the total within a relative tolerance
///
/// The bound never drops below `f64::EPSILON`, so a zero total still admits
/// rounding noise.
pub fn check_efficiency(attribution: &Attribution, tolerance: f64) -> Result<()> {
    let sum: f64 = attribution.values.iter().map(|v| v.value).sum();
    let total = attribution.total;
    let bound = (tolerance * total.abs()).max(f64::EPSILON);
    if !sum.is_finite() || (sum - total).abs() > bound {
        error!(sum, total, "Operator values do not sum to the grand coalition value");
        return Err(RewardsError::NumericalInconsistency { sum, total });
    }
    Ok(())
}

/// Weight of a marginal over a coalition of size `k`: k!(n-k-1)!/n!
fn weights(n: usize) -> Vec<f64> {
    let mut w = vec![0.0; n];
    if n == 0 {
        return w;
    }
    w[0] = 1.0 / n as f64;
    for k in 1..n {
        w[k] = w[k - 1] * k as f64 / (n - k) as f64;
    }
    w
}

fn exact(
    game: &Game,
    value_fn: &dyn ValueFunction,
    cancel: &CancellationToken,
) -> Result<(f64, f64, Vec<f64>)> {
    let n = game.player_count();
    let table: Vec<f64> = (0..1u64 << n)
        .into_par_iter()
        .map(|bits| {
            if cancel.is_cancelled() {
                return Err(RewardsError::Cancelled);
            }
            Ok(value_fn.value(game, Coalition::from_bits(bits)))
        })
        .collect::<Result<_>>()?;

    let w = weights(n);
    let phi = (0..n)
        .map(|i| {
            let bit = 1u64 << i;
            (0..1u64 << n)
                .filter(|s| s & bit == 0)
                .map(|s| w[s.count_ones() as usize] * (table[(s | bit) as usize] - table[s as usize]))
                .sum::<f64>()
        })
        .collect();

    Ok((table[0], table[game.grand().bits() as usize], phi))
}

fn sampled(
    game: &Game,
    value_fn: &dyn ValueFunction,
    cancel: &CancellationToken,
    samples: usize,
    seed: u64,
) -> Result<(f64, f64, Vec<f64>)> {
    let n = game.player_count();
    let mut memo: HashMap<Coalition, f64> = HashMap::new();
    let mut eval = |coalition: Coalition| -> Result<f64> {
        if let Some(v) = memo.get(&coalition) {
            return Ok(*v);
        }
        if cancel.is_cancelled() {
            return Err(RewardsError::Cancelled);
        }
        let v = value_fn.value(game, coalition);
        memo.insert(coalition, v);
        Ok(v)
    };

    let baseline = eval(Coalition::EMPTY)?;
    let total = eval(game.grand())?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..n).collect();
    let mut phi = vec![0.0; n];
    for _ in 0..samples {
        order.shuffle(&mut rng);
        let mut coalition = Coalition::EMPTY;
        let mut previous = baseline;
        for &player in &order {
            coalition = coalition.with(player);
            let current = eval(coalition)?;
            phi[player] += current - previous;
            previous = current;
        }
    }
    for v in &mut phi {
        *v /= samples as f64;
    }
    Ok((baseline, total, phi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValueConfig;
    use crate::model::NetworkModel;

    /// Additive game: each player is worth its index plus one
    struct Additive;

    impl ValueFunction for Additive {
        fn value(&self, _game: &Game, coalition: Coalition) -> f64 {
            10.0 + coalition.members().map(|i| (i + 1) as f64).sum::<f64>()
        }
    }

    /// Glove game: value 1 only when players 0 and 1 are both present
    struct Pair;

    impl ValueFunction for Pair {
        fn value(&self, _game: &Game, coalition: Coalition) -> f64 {
            if coalition.contains(0) && coalition.contains(1) { 1.0 } else { 0.0 }
        }
    }

    /// Non-finite everywhere but the grand coalition
    struct Broken;

    impl ValueFunction for Broken {
        fn value(&self, game: &Game, coalition: Coalition) -> f64 {
            if coalition == game.grand() { 1.0 } else { f64::NAN }
        }
    }

    fn game(n: usize) -> Game {
        let model = NetworkModel {
            private_links: vec![],
            devices: vec![],
            demands: vec![],
            public_links: vec![],
            operator_uptime: 1.0,
            contiguity_bonus: 0.0,
            demand_multiplier: 1.0,
        };
        let players = (0..n).map(|i| Operator::contributor(format!("op{i:02}"))).collect();
        Game::with_link_players(&model, players, vec![], &ValueConfig::default()).unwrap()
    }

    #[test]
    fn test_weights_sum_over_sizes() {
        let n = 5;
        let w = weights(n);
        // sum over k of C(n-1, k) * w[k] == 1
        let mut binom = 1.0;
        let mut acc = 0.0;
        for (k, wk) in w.iter().enumerate() {
            acc += binom * wk;
            binom = binom * (n - 1 - k) as f64 / (k + 1) as f64;
        }
        assert!((acc - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_additive_game_is_exact() {
        let computer = ShapleyComputer::new(ShapleyConfig::default());
        let result = computer
            .compute(&game(4), &Additive, &CancellationToken::new())
            .unwrap();

        assert_eq!(result.exactness, Exactness::Exact);
        assert_eq!(result.total, 20.0);
        assert_eq!(result.baseline(), 10.0);
        for i in 0..4 {
            let op = Operator::contributor(format!("op{i:02}"));
            assert!((result.value_of(&op) - (i + 1) as f64).abs() < 1e-12);
        }
        let proportions: f64 = result.values.iter().map(|v| v.proportion).sum();
        assert!((proportions - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_complementary_players_split_evenly() {
        let computer = ShapleyComputer::new(ShapleyConfig::default());
        let result = computer
            .compute(&game(3), &Pair, &CancellationToken::new())
            .unwrap();
        assert!((result.value_of(&Operator::contributor("op00")) - 0.5).abs() < 1e-12);
        assert!((result.value_of(&Operator::contributor("op01")) - 0.5).abs() < 1e-12);
        assert!(result.value_of(&Operator::contributor("op02")).abs() < 1e-12);
    }

    #[test]
    fn test_sampling_above_exact_limit() {
        let config = ShapleyConfig {
            max_exact_players: 2,
            max_players: 6,
            samples: 200,
            ..ShapleyConfig::default()
        };
        let result = ShapleyComputer::new(config)
            .compute(&game(5), &Additive, &CancellationToken::new())
            .unwrap();

        assert_eq!(result.exactness, Exactness::Approximate { samples: 200 });
        // additive marginals are order independent
        assert!((result.value_of(&Operator::contributor("op04")) - 5.0).abs() < 1e-9);
        assert!((result.total - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_sampling_is_seeded() {
        let config = ShapleyConfig {
            max_exact_players: 1,
            samples: 50,
            ..ShapleyConfig::default()
        };
        let computer = ShapleyComputer::new(config);
        let a = computer.compute(&game(4), &Pair, &CancellationToken::new()).unwrap();
        let b = computer.compute(&game(4), &Pair, &CancellationToken::new()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_ceiling_refuses() {
        let config = ShapleyConfig {
            max_exact_players: 2,
            max_players: 3,
            ..ShapleyConfig::default()
        };
        let err = ShapleyComputer::new(config)
            .compute(&game(4), &Additive, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(
            err,
            RewardsError::PlayerCountTooLarge {
                players: 4,
                ceiling: 3
            }
        ));
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = ShapleyComputer::new(ShapleyConfig::default())
            .compute(&game(2), &Additive, &cancel)
            .unwrap_err();
        assert!(matches!(err, RewardsError::Cancelled));
    }

    #[test]
    fn test_inconsistent_values_are_rejected() {
        let err = ShapleyComputer::new(ShapleyConfig::default())
            .compute(&game(2), &Broken, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, RewardsError::NumericalInconsistency { .. }));
    }

    fn attribution(values: &[f64], total: f64) -> Attribution {
        Attribution {
            values: values
                .iter()
                .map(|&value| OperatorValue {
                    operator: Operator::Public,
                    value,
                    proportion: 0.0,
                })
                .collect(),
            total,
            exactness: Exactness::Exact,
        }
    }

    #[test]
    fn test_efficiency_is_relative_for_small_totals() {
        // 9e-7 off a total of 0.5 is 1.8e-6 relative
        let err = check_efficiency(&attribution(&[0.25, 0.25 + 9e-7], 0.5), 1e-6).unwrap_err();
        assert!(matches!(err, RewardsError::NumericalInconsistency { .. }));
        assert!(check_efficiency(&attribution(&[0.25, 0.25 + 1e-7], 0.5), 1e-6).is_ok());
    }

    #[test]
    fn test_efficiency_floor_at_zero_total() {
        assert!(check_efficiency(&attribution(&[1e-17, -1e-17], 0.0), 1e-6).is_ok());
        assert!(check_efficiency(&attribution(&[1e-9], 0.0), 1e-6).is_err());
    }

    #[test]
    fn test_no_players_reports_baseline() {
        let result = ShapleyComputer::new(ShapleyConfig::default())
            .compute(&game(0), &Additive, &CancellationToken::new())
            .unwrap();
        assert_eq!(result.values.len(), 1);
        assert_eq!(result.total, 10.0);
        assert_eq!(result.baseline(), 10.0);
    }
}
