use std::collections::{BTreeMap, VecDeque};

use bitflags::bitflags;
use colony_proto::{Heading, Order};
use serde::{Deserialize, Serialize};

use crate::geometry::{displace, wrap, Cell, Move};
use crate::world::{EntityId, WorldSnapshot};

bitflags! {
    /// Static cell contents that a moving ant may not enter.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Blockers: u8 {
        const WATER = 0b01;
        const FOOD = 0b10;
    }
}

impl Default for Blockers {
    fn default() -> Self {
        Blockers::WATER | Blockers::FOOD
    }
}

impl Blockers {
    pub fn blocks(self, world: &WorldSnapshot, cell: Cell) -> bool {
        (self.contains(Blockers::WATER) && world.is_water(cell))
            || (self.contains(Blockers::FOOD) && world.is_food(cell))
    }
}

/// Where one entity is expected to stand after the current turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Plan {
    pub id: EntityId,
    pub origin: Cell,
    pub target: Cell,
    pub mv: Move,
}

/// Prioritised moves proposed for the entity standing at `origin`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveRequest {
    pub id: EntityId,
    pub origin: Cell,
    pub moves: Vec<Move>,
}

impl MoveRequest {
    pub fn new(id: EntityId, origin: Cell, moves: Vec<Move>) -> Self {
        Self { id, origin, moves }
    }

    pub fn stay(id: EntityId, origin: Cell) -> Self {
        Self::new(id, origin, vec![Move::Stay])
    }
}

/// Conflict-free assignment keyed by target cell.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    pub plans: BTreeMap<Cell, Plan>,
    pub evictions: u32,
    pub rejections: u32,
}

impl Resolution {
    /// Orders for every plan that actually moves, in row-major origin order.
    pub fn orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .plans
            .values()
            .filter_map(|plan| {
                heading(plan.mv).map(|heading| Order {
                    row: plan.origin.row,
                    col: plan.origin.col,
                    heading,
                })
            })
            .collect();
        orders.sort();
        orders
    }

    pub fn plan_for(&self, id: EntityId) -> Option<&Plan> {
        self.plans.values().find(|plan| plan.id == id)
    }

    pub fn moving(&self) -> usize {
        self.plans
            .values()
            .filter(|plan| plan.mv != Move::Stay)
            .count()
    }
}

fn heading(mv: Move) -> Option<Heading> {
    match mv {
        Move::North => Some(Heading::North),
        Move::East => Some(Heading::East),
        Move::South => Some(Heading::South),
        Move::West => Some(Heading::West),
        Move::Stay => None,
    }
}

/// Gale–Shapley matching of entities (proposers) onto cells (acceptors).
///
/// A cell keeps its first claimant unless the newcomer is staying on its own
/// cell, in which case the earlier claimant is evicted and proposes again.
#[derive(Clone, Copy, Debug, Default)]
pub struct MoveResolver {
    blockers: Blockers,
}

struct Proposer {
    id: EntityId,
    origin: Cell,
    moves: VecDeque<Move>,
}

impl MoveResolver {
    pub fn new(blockers: Blockers) -> Self {
        Self { blockers }
    }

    pub fn blockers(&self) -> Blockers {
        self.blockers
    }

    pub fn resolve(&self, world: &WorldSnapshot, requests: Vec<MoveRequest>) -> Resolution {
        let size = world.size();
        let mut proposers: Vec<Proposer> = requests
            .into_iter()
            .map(|request| {
                let mut moves: VecDeque<Move> = request.moves.into();
                moves.push_back(Move::Stay);
                Proposer {
                    id: request.id,
                    origin: wrap(request.origin, size),
                    moves,
                }
            })
            .collect();

        let mut claims: BTreeMap<Cell, (usize, Move)> = BTreeMap::new();
        let mut unmatched: VecDeque<usize> = (0..proposers.len()).collect();
        let mut resolution = Resolution::default();

        while let Some(index) = unmatched.pop_front() {
            let proposer = &mut proposers[index];
            let (mv, target) = loop {
                let mv = proposer.moves.pop_front().unwrap_or(Move::Stay);
                let target = wrap(displace(mv, proposer.origin), size);
                if mv == Move::Stay || !self.blockers.blocks(world, target) {
                    break (mv, target);
                }
            };

            match claims.get(&target).copied() {
                None => {
                    claims.insert(target, (index, mv));
                }
                Some((holder, _)) if mv == Move::Stay => {
                    claims.insert(target, (index, mv));
                    unmatched.push_back(holder);
                    resolution.evictions += 1;
                }
                Some(_) => {
                    unmatched.push_back(index);
                    resolution.rejections += 1;
                }
            }
        }

        for (target, (index, mv)) in claims {
            let proposer = &proposers[index];
            resolution.plans.insert(
                target,
                Plan {
                    id: proposer.id,
                    origin: proposer.origin,
                    target,
                    mv,
                },
            );
        }
        resolution
    }
}
