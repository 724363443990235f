#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use colony_core::geometry::{displace, wrap};
use colony_core::{
    Cell, Deadline, DeciderKind, EngineConfig, ExpertKind, Move, SensorReport, Size, TurnEngine,
};
use colony_proto::{GameParameters, Heading, Order};

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn gather_only_config() -> Arc<EngineConfig> {
    let path = fixture_path("gather_only.json");
    let config = EngineConfig::from_file(&path)
        .unwrap_or_else(|err| panic!("fixture {} should load: {err}", path.display()));
    Arc::new(config)
}

pub fn params(rows: u64, cols: u64, view_radius2: u64, seed: u64) -> GameParameters {
    GameParameters {
        rows,
        cols,
        view_radius2,
        player_seed: seed,
        ..GameParameters::default()
    }
}

pub fn engine_with(params: GameParameters, experts: Vec<ExpertKind>) -> TurnEngine {
    let config = Arc::new(EngineConfig::default().with_experts(experts));
    TurnEngine::start(params, config, DeciderKind::Hedge).expect("valid parameters")
}

pub fn order_lines(orders: &[Order]) -> Vec<String> {
    orders.iter().map(ToString::to_string).collect()
}

fn heading_move(heading: Heading) -> Move {
    match heading {
        Heading::North => Move::North,
        Heading::East => Move::East,
        Heading::South => Move::South,
        Heading::West => Move::West,
    }
}

/// Just enough of a game server to feed the engine consistent reports:
/// static water, food and enemies, and our ants moving as ordered unless
/// they walk into water or onto food.
pub struct MiniGame {
    pub size: Size,
    pub water: BTreeSet<Cell>,
    pub food: BTreeSet<Cell>,
    pub enemies: BTreeSet<Cell>,
    pub ants: BTreeSet<Cell>,
}

impl MiniGame {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            water: BTreeSet::new(),
            food: BTreeSet::new(),
            enemies: BTreeSet::new(),
            ants: BTreeSet::new(),
        }
    }

    /// A repeatable mixed board.
    pub fn scattered(size: Size) -> Self {
        let mut game = Self::new(size);
        for row in 0..size.height {
            for col in 0..size.width {
                let cell = Cell::new(row, col);
                match (row * 13 + col * 7) % 19 {
                    0 => {
                        game.ants.insert(cell);
                    }
                    1 | 2 => {
                        game.water.insert(cell);
                    }
                    3 => {
                        game.food.insert(cell);
                    }
                    4 => {
                        game.enemies.insert(cell);
                    }
                    _ => {}
                }
            }
        }
        game
    }

    pub fn report(&self) -> SensorReport {
        SensorReport {
            water: self.water.iter().copied().collect(),
            food: self.food.iter().copied().collect(),
            hills: Vec::new(),
            ants: self
                .ants
                .iter()
                .map(|cell| (*cell, 0))
                .chain(self.enemies.iter().map(|cell| (*cell, 1)))
                .collect(),
            dead: Vec::new(),
        }
    }

    pub fn apply(&mut self, orders: &[Order]) {
        let mut moved = BTreeSet::new();
        let mut staying = self.ants.clone();
        for order in orders {
            let origin = Cell::new(order.row, order.col);
            assert!(staying.remove(&origin), "order for a cell without an ant: {order}");
            let target = wrap(displace(heading_move(order.heading), origin), self.size);
            if self.water.contains(&target) || self.food.contains(&target) {
                moved.insert(origin);
            } else {
                moved.insert(target);
            }
        }
        let expected = self.ants.len();
        self.ants = staying.union(&moved).copied().collect();
        assert_eq!(self.ants.len(), expected, "two ants ended on one cell");
    }

    /// Run `turns` turns and collect the order lines of each.
    pub fn play(&mut self, engine: &mut TurnEngine, turns: usize) -> Vec<Vec<String>> {
        (0..turns)
            .map(|_| {
                let outcome = engine.run_turn_until(&self.report(), Deadline::never());
                self.apply(&outcome.orders);
                order_lines(&outcome.orders)
            })
            .collect()
    }
}
