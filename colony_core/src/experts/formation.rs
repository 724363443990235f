use crate::distribution::MoveDistribution;
use crate::geometry::{
    axis_moves_for_delta, neighbors4, neighbors8, primary_axis_moves, Cell, Move,
};
use crate::learner::Opinion;
use crate::world::Category;

use super::{approach, TurnView, PRIMARY_SHARE};

/// Friends closer than this are already part of the clump.
const CLUMP_NEAR2: u32 = 2 * 2;
const CLUMP_FAR2: u32 = 4 * 4;
/// Squared 2.5: ants nearer than this are ignored when exploring.
const EXPLORE_IGNORE2: f64 = 6.25;
/// Share of a retreat given to the dominant axis. Favouring the minor axis
/// backs off sideways and gives up less ground.
const RETREAT_SHARE: f64 = 0.25;

/// Walks toward the nearest friendly ant that is neither too close nor too
/// far, if the way is clear.
#[derive(Clone, Copy, Debug, Default)]
pub struct Clump;

impl Clump {
    pub fn step(&mut self, view: &TurnView<'_>) -> Opinion {
        let digest = view.digest();
        view.entities()
            .filter_map(|ant| {
                let friend = *digest.digest(Category::MyAnt, ant.cell).first()?;
                if friend.distance2 <= CLUMP_NEAR2
                    || friend.distance2 >= CLUMP_FAR2
                    || !digest.ray(ant.cell, friend.cell)
                {
                    return None;
                }
                approach(primary_axis_moves(ant.cell, friend.cell), PRIMARY_SHARE)
                    .map(|dist| (ant.id, dist))
            })
            .collect()
    }
}

/// Moves away from the centroid of the ants in view, ignoring the ones
/// within 2.5 cells.
#[derive(Clone, Copy, Debug, Default)]
pub struct Explore;

impl Explore {
    pub fn step(&mut self, view: &TurnView<'_>) -> Opinion {
        let digest = view.digest();
        view.entities()
            .filter_map(|ant| {
                let friends = digest.digest(Category::MyAnt, ant.cell);
                let enemies = digest.digest(Category::EnemyAnt, ant.cell);
                let crowd: Vec<Cell> = friends
                    .iter()
                    .chain(enemies.iter())
                    .filter(|goal| f64::from(goal.distance2) > EXPLORE_IGNORE2)
                    .map(|goal| goal.cell)
                    .collect();
                if crowd.is_empty() {
                    return None;
                }
                // scaled by the crowd size so the centroid stays integral
                let count = crowd.len() as i64;
                let row_sum: i64 = crowd.iter().map(|cell| i64::from(cell.row)).sum();
                let col_sum: i64 = crowd.iter().map(|cell| i64::from(cell.col)).sum();
                let moves = axis_moves_for_delta(
                    count * i64::from(ant.cell.row) - row_sum,
                    count * i64::from(ant.cell.col) - col_sum,
                );
                approach(moves, PRIMARY_SHARE).map(|dist| (ant.id, dist))
            })
            .collect()
    }
}

/// Squared attack range plus two: the edge of the zone around an enemy that
/// [`KeepDistance`] backs out of and [`Mob`](super::Mob) closes in to.
pub(crate) fn hold_distance2(attack_radius: i32) -> u32 {
    let reach = attack_radius.max(0) as u32 + 2;
    reach * reach
}

/// Backs away from a visible enemy inside attack range plus two.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeepDistance;

impl KeepDistance {
    pub fn step(&mut self, view: &TurnView<'_>) -> Opinion {
        let digest = view.digest();
        let retreat2 = hold_distance2(view.attack_radius());
        view.entities()
            .filter_map(|ant| {
                let enemy = *digest.digest(Category::EnemyAnt, ant.cell).first()?;
                if enemy.distance2 > retreat2 || !digest.ray(ant.cell, enemy.cell) {
                    return None;
                }
                approach(primary_axis_moves(enemy.cell, ant.cell), RETREAT_SHARE)
                    .map(|dist| (ant.id, dist))
            })
            .collect()
    }
}

/// Steps toward the midpoint between our nearest hill and the nearest enemy
/// that can be seen from here.
#[derive(Clone, Copy, Debug, Default)]
pub struct Defend;

impl Defend {
    pub fn step(&mut self, view: &TurnView<'_>) -> Opinion {
        let digest = view.digest();
        view.entities()
            .filter_map(|ant| {
                let hill = *digest.digest(Category::MyHill, ant.cell).first()?;
                let enemy = *digest.digest(Category::EnemyAnt, ant.cell).first()?;
                if !digest.ray(ant.cell, enemy.cell) {
                    return None;
                }
                let observer = view.world().wrap(ant.cell);
                let row_twice = i64::from(hill.cell.row) + i64::from(enemy.cell.row);
                let col_twice = i64::from(hill.cell.col) + i64::from(enemy.cell.col);
                let midpoint = Cell::new(
                    row_twice.div_euclid(2) as i32,
                    col_twice.div_euclid(2) as i32,
                );
                if !digest.ray(observer, midpoint) {
                    return None;
                }
                let moves = axis_moves_for_delta(
                    row_twice - 2 * i64::from(observer.row),
                    col_twice - 2 * i64::from(observer.col),
                );
                approach(moves, PRIMARY_SHARE).map(|dist| (ant.id, dist))
            })
            .collect()
    }
}

/// Keeps the nearest own hill clear: ants on it or beside it scatter, ants
/// one ring further out step away.
#[derive(Clone, Copy, Debug, Default)]
pub struct StayOffHill;

impl StayOffHill {
    pub fn step(&mut self, view: &TurnView<'_>) -> Opinion {
        let digest = view.digest();
        view.entities()
            .filter_map(|ant| {
                let hill = *digest.digest(Category::MyHill, ant.cell).first()?;
                let observer = view.world().wrap(ant.cell);
                let offset =
                    Cell::new(observer.row - hill.cell.row, observer.col - hill.cell.col);
                if hill.distance2 <= 1 {
                    return Some((ant.id, MoveDistribution::uniform(&Move::CARDINAL)));
                }
                if !in_hill_ring(offset) {
                    return None;
                }
                approach(primary_axis_moves(hill.cell, observer), 0.5)
                    .map(|dist| (ant.id, dist))
            })
            .collect()
    }
}

/// Offsets from a hill that touch one of its four neighbours without being
/// the hill or a neighbour themselves.
fn in_hill_ring(offset: Cell) -> bool {
    let hill = Cell::new(0, 0);
    offset.row.abs() + offset.col.abs() > 1
        && neighbors4(hill)
            .into_iter()
            .any(|side| neighbors8(side).contains(&offset))
}
