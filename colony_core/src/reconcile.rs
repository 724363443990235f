//! Cross-turn identity for our ants.
//!
//! The server reports where ants stand but never which ant is which. Identity
//! is carried from one turn to the next through the plans committed after
//! move resolution: an ant found on a plan's target made that move, an ant
//! found on a plan's origin was blocked, anything else is a birth.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::trace;

use crate::geometry::{displace, neighbors4, wrap, Cell, Size};
use crate::resolver::Plan;
use crate::world::{Entity, EntityId};

/// A plan nobody claimed this turn, matched to a dead-ant report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Death {
    pub id: EntityId,
    pub cell: Cell,
}

/// Outcome of one reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Living entities in row-major order of their current cell.
    pub ants: Vec<Entity>,
    pub deaths: Vec<Death>,
    pub births: Vec<EntityId>,
    pub blocked: Vec<EntityId>,
}

impl Reconciliation {
    pub fn dead_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.deaths.iter().map(|death| Entity {
            id: death.id,
            cell: death.cell,
            previous: death.cell,
        })
    }
}

#[derive(Clone, Debug)]
pub struct Reconciler {
    size: Size,
    next_id: u32,
    outstanding: BTreeMap<Cell, Plan>,
}

impl Reconciler {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            next_id: 0,
            outstanding: BTreeMap::new(),
        }
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn outstanding(&self) -> &BTreeMap<Cell, Plan> {
        &self.outstanding
    }

    /// Store the resolver's plans; they link identities into the next turn.
    pub fn commit(&mut self, plans: BTreeMap<Cell, Plan>) {
        self.outstanding = plans
            .into_values()
            .map(|plan| {
                let target = wrap(plan.target, self.size);
                (
                    target,
                    Plan {
                        origin: wrap(plan.origin, self.size),
                        target,
                        ..plan
                    },
                )
            })
            .collect();
    }

    /// Bind this turn's living and dead reports to entity identities.
    ///
    /// # Panics
    ///
    /// Panics when two outstanding plans both explain the same blocked ant,
    /// or when the number of dead reports differs from the number of plans
    /// left unexplained by the living.
    pub fn reconcile(&mut self, living: &[Cell], dead: &[Cell]) -> Reconciliation {
        let size = self.size;
        let living: BTreeSet<Cell> = living.iter().map(|cell| wrap(*cell, size)).collect();
        let mut outstanding = std::mem::take(&mut self.outstanding);
        let mut bound: BTreeMap<Cell, Entity> = BTreeMap::new();
        let mut result = Reconciliation::default();

        for &cell in &living {
            if let Some(plan) = outstanding.remove(&cell) {
                bound.insert(
                    cell,
                    Entity {
                        id: plan.id,
                        cell,
                        previous: plan.origin,
                    },
                );
            }
        }

        let unexplained: Vec<Cell> = living
            .iter()
            .copied()
            .filter(|cell| !bound.contains_key(cell))
            .collect();
        for cell in unexplained {
            let candidates: Vec<Cell> = neighbors4(cell)
                .into_iter()
                .map(|neighbor| wrap(neighbor, size))
                .filter(|neighbor| {
                    outstanding.get(neighbor).is_some_and(|plan| {
                        plan.origin == cell && wrap(displace(plan.mv, cell), size) == *neighbor
                    })
                })
                .collect();
            assert!(
                candidates.len() <= 1,
                "ant at {cell} is claimed as blocked by {} plans",
                candidates.len()
            );
            if let Some(plan) = candidates.first().and_then(|key| outstanding.remove(key)) {
                trace!(
                    target: "colony::reconcile",
                    id = %plan.id,
                    cell = %cell,
                    intended = %plan.target,
                    "ant_blocked"
                );
                result.blocked.push(plan.id);
                bound.insert(
                    cell,
                    Entity {
                        id: plan.id,
                        cell,
                        previous: cell,
                    },
                );
            }
        }

        for &cell in &living {
            if bound.contains_key(&cell) {
                continue;
            }
            let id = EntityId(self.next_id);
            self.next_id += 1;
            result.births.push(id);
            bound.insert(
                cell,
                Entity {
                    id,
                    cell,
                    previous: cell,
                },
            );
        }

        let mut dead_cells: BTreeSet<Cell> = dead.iter().map(|cell| wrap(*cell, size)).collect();
        for plan in outstanding.into_values() {
            let cell = if dead_cells.remove(&plan.target) {
                plan.target
            } else if dead_cells.remove(&plan.origin) {
                plan.origin
            } else {
                plan.target
            };
            result.deaths.push(Death { id: plan.id, cell });
        }
        assert_eq!(
            dead.len(),
            result.deaths.len(),
            "dead reports do not match unconfirmed plans"
        );

        result.ants = bound.into_values().collect();
        result
    }
}
