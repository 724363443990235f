use std::collections::BTreeMap;

use crate::distribution::MoveDistribution;
use crate::geometry::{neighbors8, primary_axis_moves};
use crate::learner::Opinion;
use crate::world::{Category, EntityId};

use super::formation::hold_distance2;
use super::{approach, TurnView, PRIMARY_SHARE};

/// Share of a mob approach given to the dominant axis.
const MOB_SHARE: f64 = 0.65;

/// Walks onto the nearest enemy hill when nothing stands on or beside it and
/// the straight path is clear.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlomHill;

impl GlomHill {
    pub fn step(&mut self, view: &TurnView<'_>) -> Opinion {
        let digest = view.digest();
        let world = view.world();
        view.entities()
            .filter_map(|ant| {
                let hill = *digest.digest(Category::EnemyHill, ant.cell).first()?;
                let guarded = neighbors8(hill.cell)
                    .into_iter()
                    .chain([hill.cell])
                    .any(|cell| world.contains(Category::EnemyAnt, cell));
                if guarded || !digest.ray(ant.cell, hill.cell) {
                    return None;
                }
                approach(primary_axis_moves(ant.cell, hill.cell), PRIMARY_SHARE)
                    .map(|dist| (ant.id, dist))
            })
            .collect()
    }
}

/// Closes in on every visible enemy with the ants that still stand outside
/// its attack range plus two. An ant called by several enemies splits its
/// opinion evenly between them.
#[derive(Clone, Copy, Debug, Default)]
pub struct Mob;

impl Mob {
    pub fn step(&mut self, view: &TurnView<'_>) -> Opinion {
        let digest = view.digest();
        let world = view.world();
        let hold2 = hold_distance2(view.attack_radius());

        let mut calls: BTreeMap<EntityId, Vec<MoveDistribution>> = BTreeMap::new();
        for enemy in world.cells(Category::EnemyAnt) {
            for friend in digest.digest(Category::MyAnt, enemy).iter() {
                if friend.distance2 <= hold2 || !digest.ray(friend.cell, enemy) {
                    continue;
                }
                let Some(ant) = world.entity_at(friend.cell) else {
                    continue;
                };
                if let Some(dist) = approach(primary_axis_moves(friend.cell, enemy), MOB_SHARE) {
                    calls.entry(ant.id).or_default().push(dist);
                }
            }
        }

        calls
            .into_iter()
            .map(|(id, dists)| {
                let share = 1.0 / dists.len() as f64;
                let mut joined = MoveDistribution::empty();
                for dist in &dists {
                    for (mv, weight) in dist.iter() {
                        joined.add(mv, weight * share);
                    }
                }
                (id, joined)
            })
            .collect()
    }
}
