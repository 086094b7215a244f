//! Game-theoretic properties of the value function and attribution

mod common;

use common::*;
use lake_rewards::config::ValueConfig;
use lake_rewards::{
    Coalition, CoalitionReducer, Game, Operator, PathValue, ReducedModel, RewardsConfig,
    Simulator, ValueFunction,
};
use tokio_util::sync::CancellationToken;

fn identity_game(model: lake_rewards::NetworkModel) -> Game {
    Game::new(&ReducedModel::identity(model), &ValueConfig::default()).unwrap()
}

fn exact_simulator() -> Simulator {
    let mut config = RewardsConfig::default();
    config.shapley.collapse_threshold = 0;
    Simulator::new(&config)
}

#[test]
fn test_value_is_monotone() {
    for seed in 0..8 {
        let game = identity_game(random_model(seed, 5, 6));
        let n = game.player_count();
        for bits in 0..(1u64 << n) {
            let s = Coalition::from_bits(bits);
            let v = PathValue.value(&game, s);
            for i in (0..n).filter(|i| !s.contains(*i)) {
                let larger = PathValue.value(&game, s.with(i));
                assert!(
                    v <= larger + 1e-12,
                    "seed {seed}: v({s}) = {v} > v({}) = {larger}",
                    s.with(i)
                );
            }
        }
    }
}

#[test]
fn test_values_sum_to_grand_coalition() {
    for seed in 0..8 {
        let model = random_model(seed, 6, 7);
        let game = identity_game(model.clone());
        let grand = PathValue.value(&game, game.grand());

        let result = exact_simulator()
            .simulate(&model, &PathValue, &CancellationToken::new())
            .unwrap();
        let sum: f64 = result.values.iter().map(|v| v.value).sum();
        assert!((sum - grand).abs() <= 1e-6 * grand.abs().max(1.0), "seed {seed}");
        assert_eq!(result.total, grand);
    }
}

#[test]
fn test_sampled_values_sum_to_grand_coalition() {
    let mut config = RewardsConfig::default();
    config.shapley.collapse_threshold = 0;
    config.shapley.max_exact_players = 3;
    config.shapley.samples = 300;
    let model = random_model(42, 7, 8);

    let result = Simulator::new(&config)
        .simulate(&model, &PathValue, &CancellationToken::new())
        .unwrap();
    assert!(!result.exactness.is_exact());
    let sum: f64 = result.values.iter().map(|v| v.value).sum();
    assert!((sum - result.total).abs() <= 1e-6 * result.total.abs().max(1.0));
}

#[test]
fn test_interchangeable_operators_split_evenly() {
    // alpha and beta mirror each other around HUB
    let model = lake_rewards::NetworkModel {
        devices: vec![
            device("a-hub", "alpha", "HUB"),
            device("a-l", "alpha", "LEFT"),
            device("b-hub", "beta", "HUB"),
            device("b-r", "beta", "RIGHT"),
        ],
        private_links: vec![
            link("a-hub", "a-l", 12.0, 0.99),
            link("b-hub", "b-r", 12.0, 0.99),
        ],
        public_links: vec![
            public("HUB", "LEFT", 90.0),
            public("HUB", "RIGHT", 90.0),
            public("LEFT", "RIGHT", 160.0),
        ],
        demands: vec![
            demand("HUB", "LEFT", 0.5),
            demand("HUB", "RIGHT", 0.5),
            demand("LEFT", "RIGHT", 1.0),
        ],
        ..empty_model()
    };

    let result = exact_simulator()
        .simulate(&model, &PathValue, &CancellationToken::new())
        .unwrap();
    let alpha = result.value_of(&Operator::contributor("alpha"));
    let beta = result.value_of(&Operator::contributor("beta"));
    assert!(alpha > 0.0);
    assert!((alpha - beta).abs() < 1e-9, "alpha {alpha} beta {beta}");
}

#[test]
fn test_unused_operator_gets_nothing() {
    let mut model = two_hop_chain();
    model.devices.push(device("g-1", "gamma", "OSL"));
    model.devices.push(device("g-2", "gamma", "HEL"));
    model.private_links.push(link("g-1", "g-2", 5.0, 0.99));

    let result = exact_simulator()
        .simulate(&model, &PathValue, &CancellationToken::new())
        .unwrap();
    assert!(result.value_of(&Operator::contributor("gamma")).abs() < 1e-12);
}

#[test]
fn test_collapsing_keeps_grand_value() {
    for seed in 0..5 {
        let model = random_model(seed, 6, 6);
        let config = ValueConfig::default();
        let full = identity_game(model.clone());
        let reduced = CoalitionReducer::new(4).reduce(model);
        assert!(!reduced.collapsed().is_empty(), "seed {seed} collapsed nothing");
        let collapsed = Game::new(&reduced, &config).unwrap();

        let a = PathValue.value(&full, full.grand());
        let b = PathValue.value(&collapsed, collapsed.grand());
        assert!((a - b).abs() < 1e-12, "seed {seed}: {a} vs {b}");
    }
}

#[test]
fn test_two_hop_chain() {
    let model = two_hop_chain();
    let game = identity_game(model.clone());
    let a = game.player_index(&Operator::contributor("A")).unwrap();
    let b = game.player_index(&Operator::contributor("B")).unwrap();

    let empty = PathValue.value(&game, Coalition::EMPTY);
    let only_a = PathValue.value(&game, Coalition::EMPTY.with(a));
    let only_b = PathValue.value(&game, Coalition::EMPTY.with(b));
    let both = PathValue.value(&game, game.grand());

    // public only: 150ms plus one hop, 100ms scale
    assert!((empty - (-1.51f64).exp()).abs() < 1e-12);
    assert!(both > only_a);
    assert!(both > only_b);

    let result = exact_simulator()
        .simulate(&model, &PathValue, &CancellationToken::new())
        .unwrap();
    let phi_a = result.value_of(&Operator::contributor("A"));
    let phi_b = result.value_of(&Operator::contributor("B"));
    assert!((phi_a - phi_b).abs() < 1e-12);
    assert!((phi_a + phi_b - (both - empty)).abs() < 1e-12);
    assert_eq!(result.baseline(), empty);
    assert_eq!(result.values[0].operator, Operator::Public);
}

#[test]
fn test_attribution_is_deterministic() {
    let model = random_model(7, 6, 6);
    let simulator = exact_simulator();
    let first = simulator
        .simulate(&model, &PathValue, &CancellationToken::new())
        .unwrap();
    let second = simulator
        .simulate(&model, &PathValue, &CancellationToken::new())
        .unwrap();
    assert_eq!(first, second);
}
