use std::collections::{BTreeMap, BTreeSet};

use crate::geometry::{primary_axis_moves, Cell};
use crate::learner::Opinion;
use crate::world::{Category, EntityId};

use super::{approach, TurnView, PRIMARY_SHARE};

/// Sends at most one ant after each food it can walk to. An ant keeps its
/// food until the food disappears or the ant dies.
#[derive(Clone, Debug, Default)]
pub struct Gather {
    goals: BTreeMap<EntityId, Cell>,
    taken: BTreeSet<Cell>,
}

impl Gather {
    pub fn step(&mut self, view: &TurnView<'_>) -> Opinion {
        let world = view.world();
        let digest = view.digest();

        let alive: BTreeSet<EntityId> = view.entities().map(|ant| ant.id).collect();
        let taken = &mut self.taken;
        self.goals.retain(|id, goal| {
            let keep = alive.contains(id) && world.is_food(*goal);
            if !keep {
                taken.remove(goal);
            }
            keep
        });

        let mut opinion = Opinion::new();
        for ant in view.entities() {
            if !self.goals.contains_key(&ant.id) {
                let free = digest
                    .reachable_digest(Category::Food, ant.cell)
                    .iter()
                    .map(|goal| world.wrap(goal.cell))
                    .find(|food| !self.taken.contains(food));
                if let Some(food) = free {
                    self.taken.insert(food);
                    self.goals.insert(ant.id, food);
                }
            }
            let Some(goal) = self.goals.get(&ant.id) else {
                continue;
            };
            let (_, image) = digest.nearest(ant.cell, *goal);
            if let Some(dist) = approach(primary_axis_moves(ant.cell, image), PRIMARY_SHARE) {
                opinion.insert(ant.id, dist);
            }
        }
        opinion
    }

    pub fn goal_of(&self, id: EntityId) -> Option<Cell> {
        self.goals.get(&id).copied()
    }
}

/// Heads for the nearest walkable food with a clear straight path.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlomFood;

impl GlomFood {
    pub fn step(&mut self, view: &TurnView<'_>) -> Opinion {
        let digest = view.digest();
        view.entities()
            .filter_map(|ant| {
                let food = digest
                    .reachable_digest(Category::Food, ant.cell)
                    .iter()
                    .find(|goal| digest.ray(ant.cell, goal.cell))
                    .copied()?;
                approach(primary_axis_moves(ant.cell, food.cell), PRIMARY_SHARE)
                    .map(|dist| (ant.id, dist))
            })
            .collect()
    }
}
