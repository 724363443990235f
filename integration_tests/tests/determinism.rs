mod common;

use std::sync::Arc;

use colony_core::{DeciderKind, EngineConfig, ExpertKind, Size, TurnEngine};

use common::{engine_with, params, MiniGame};

fn run_game(seed: u64, turns: usize) -> (Vec<Vec<String>>, Option<Vec<f64>>) {
    let size = Size::new(24, 24);
    let mut game = MiniGame::scattered(size);
    let mut engine = engine_with(params(24, 24, 55, seed), ExpertKind::ALL.to_vec());
    let transcript = game.play(&mut engine, turns);
    (transcript, engine.decider().trust())
}

#[test]
fn same_seed_replays_identically() {
    let (orders_a, trust_a) = run_game(42, 40);
    let (orders_b, trust_b) = run_game(42, 40);

    assert_eq!(orders_a, orders_b);
    assert_eq!(trust_a, trust_b);
}

#[test]
fn seeds_drive_the_sampling() {
    let (orders_a, _) = run_game(1, 20);
    let (orders_b, _) = run_game(2, 20);
    assert_ne!(orders_a, orders_b);
}

#[test]
fn long_game_keeps_every_ant() {
    let size = Size::new(24, 24);
    let mut game = MiniGame::scattered(size);
    let ants = game.ants.len();
    let mut engine = engine_with(params(24, 24, 55, 9), ExpertKind::ALL.to_vec());
    game.play(&mut engine, 100);

    assert_eq!(game.ants.len(), ants);
    assert_eq!(engine.reconciler().next_id() as usize, ants);
    let trust = engine.decider().trust().expect("ensemble trust");
    assert!((trust.iter().sum::<f64>() - 1.0).abs() < 1e-9);
}

#[test]
fn baseline_deciders_are_reproducible() {
    for kind in [DeciderKind::Brownian, DeciderKind::Navigator] {
        let run = || {
            let size = Size::new(16, 16);
            let mut game = MiniGame::scattered(size);
            let mut engine = TurnEngine::start(
                params(16, 16, 77, 5),
                Arc::new(EngineConfig::default()),
                kind,
            )
            .expect("valid parameters");
            game.play(&mut engine, 25)
        };
        assert_eq!(run(), run(), "{kind} diverged between runs");
    }
}
