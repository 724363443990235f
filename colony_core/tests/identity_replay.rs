use std::sync::Arc;

use colony_core::{Cell, Deadline, DeciderKind, EngineConfig, EntityId, SensorReport, TurnEngine};
use colony_proto::GameParameters;

fn idle_engine() -> TurnEngine {
    // no experts: every ant abstains and stays put
    let config = Arc::new(EngineConfig::default().with_experts(Vec::new()));
    let params = GameParameters {
        rows: 16,
        cols: 16,
        ..GameParameters::default()
    };
    TurnEngine::start(params, config, DeciderKind::Hedge).expect("valid parameters")
}

fn report() -> SensorReport {
    SensorReport::new()
        .with_ant(Cell::new(0, 0), 0)
        .with_ant(Cell::new(0, 15), 0)
        .with_ant(Cell::new(7, 3), 0)
        .with_ant(Cell::new(15, 15), 0)
        .with_ant(Cell::new(8, 8), 1)
        .with_food(Cell::new(4, 4))
        .with_water(Cell::new(3, 3))
}

#[test]
fn replaying_a_still_board_keeps_identities() {
    let mut engine = idle_engine();
    let first = engine.run_turn_until(&report(), Deadline::never());
    assert_eq!(first.metrics.births, 4);
    assert!(first.orders.is_empty());

    let ids = |engine: &TurnEngine| -> Vec<(Cell, EntityId)> {
        engine
            .digest()
            .world()
            .entities()
            .map(|ant| (ant.cell, ant.id))
            .collect()
    };
    let baseline = ids(&engine);

    for _ in 0..10 {
        let outcome = engine.run_turn_until(&report(), Deadline::never());
        assert_eq!(outcome.metrics.births, 0);
        assert_eq!(outcome.metrics.deaths, 0);
        assert_eq!(ids(&engine), baseline);
    }
    assert_eq!(engine.reconciler().next_id(), 4);
}

#[test]
fn a_new_ant_is_the_only_birth() {
    let mut engine = idle_engine();
    engine.run_turn_until(&report(), Deadline::never());
    let outcome = engine.run_turn_until(&report().with_ant(Cell::new(12, 1), 0), Deadline::never());
    assert_eq!(outcome.metrics.births, 1);
    assert_eq!(
        engine
            .digest()
            .world()
            .entity_at(Cell::new(12, 1))
            .map(|ant| ant.id),
        Some(EntityId(4))
    );
}
