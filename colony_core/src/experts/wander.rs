use crate::distribution::MoveDistribution;
use crate::geometry::{displace, Move};
use crate::learner::Opinion;

use super::TurnView;

/// Spreads an ant that touches water evenly over its open sides.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unstuck;

impl Unstuck {
    pub fn step(&mut self, view: &TurnView<'_>) -> Opinion {
        let world = view.world();
        view.entities()
            .filter_map(|ant| {
                let (walls, open): (Vec<Move>, Vec<Move>) = Move::CARDINAL
                    .into_iter()
                    .partition(|mv| world.is_water(displace(*mv, ant.cell)));
                if walls.is_empty() || open.is_empty() {
                    return None;
                }
                Some((ant.id, MoveDistribution::uniform(&open)))
            })
            .collect()
    }
}

/// Hands out N, E, S, W in rotation across ants and turns.
#[derive(Clone, Copy, Debug, Default)]
pub struct Brownian {
    next: usize,
}

impl Brownian {
    pub fn step(&mut self, view: &TurnView<'_>) -> Opinion {
        view.entities()
            .map(|ant| {
                let mv = Move::CARDINAL[self.next];
                self.next = (self.next + 1) % Move::CARDINAL.len();
                (ant.id, MoveDistribution::certain(mv))
            })
            .collect()
    }
}
