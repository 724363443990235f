//! Heuristic move recommenders.
//!
//! Every expert sees the same [`TurnView`] and answers with an [`Opinion`]:
//! a move distribution for each ant it cares about. Experts keep their own
//! memory keyed by [`EntityId`](crate::world::EntityId), never by cell.

mod forage;
mod formation;
mod raid;
mod wander;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::digest::SpatialDigest;
use crate::distribution::MoveDistribution;
use crate::geometry::Move;
use crate::learner::Opinion;
use crate::world::{Entity, WorldSnapshot};

pub use forage::{Gather, GlomFood};
pub use formation::{Clump, Defend, Explore, KeepDistance, StayOffHill};
pub use raid::{GlomHill, Mob};
pub use wander::{Brownian, Unstuck};

/// Share of an approach given to the dominant axis.
pub(crate) const PRIMARY_SHARE: f64 = 0.75;

/// What one expert may look at during a turn.
#[derive(Clone, Copy, Debug)]
pub struct TurnView<'a> {
    digest: &'a SpatialDigest,
    attack_radius: i32,
}

impl<'a> TurnView<'a> {
    pub fn new(digest: &'a SpatialDigest, attack_radius: i32) -> Self {
        Self {
            digest,
            attack_radius,
        }
    }

    pub fn digest(&self) -> &'a SpatialDigest {
        self.digest
    }

    pub fn world(&self) -> &'a WorldSnapshot {
        self.digest.world()
    }

    pub fn entities(&self) -> impl Iterator<Item = &'a Entity> + 'a {
        self.digest.world().entities()
    }

    pub fn attack_radius(&self) -> i32 {
        self.attack_radius
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertKind {
    Gather,
    GlomFood,
    GlomHill,
    Clump,
    Explore,
    KeepDistance,
    Mob,
    Defend,
    StayOffHill,
    Unstuck,
    Brownian,
}

impl ExpertKind {
    pub const ALL: [ExpertKind; 11] = [
        ExpertKind::Gather,
        ExpertKind::GlomFood,
        ExpertKind::GlomHill,
        ExpertKind::Clump,
        ExpertKind::Explore,
        ExpertKind::KeepDistance,
        ExpertKind::Mob,
        ExpertKind::Defend,
        ExpertKind::StayOffHill,
        ExpertKind::Unstuck,
        ExpertKind::Brownian,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExpertKind::Gather => "gather",
            ExpertKind::GlomFood => "glom_food",
            ExpertKind::GlomHill => "glom_hill",
            ExpertKind::Clump => "clump",
            ExpertKind::Explore => "explore",
            ExpertKind::KeepDistance => "keep_distance",
            ExpertKind::Mob => "mob",
            ExpertKind::Defend => "defend",
            ExpertKind::StayOffHill => "stay_off_hill",
            ExpertKind::Unstuck => "unstuck",
            ExpertKind::Brownian => "brownian",
        }
    }
}

impl fmt::Display for ExpertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpertKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ExpertKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unknown expert '{value}'"))
    }
}

#[derive(Clone, Debug)]
pub enum Expert {
    Gather(Gather),
    GlomFood(GlomFood),
    GlomHill(GlomHill),
    Clump(Clump),
    Explore(Explore),
    KeepDistance(KeepDistance),
    Mob(Mob),
    Defend(Defend),
    StayOffHill(StayOffHill),
    Unstuck(Unstuck),
    Brownian(Brownian),
}

impl Expert {
    pub fn new(kind: ExpertKind) -> Self {
        match kind {
            ExpertKind::Gather => Expert::Gather(Gather::default()),
            ExpertKind::GlomFood => Expert::GlomFood(GlomFood),
            ExpertKind::GlomHill => Expert::GlomHill(GlomHill),
            ExpertKind::Clump => Expert::Clump(Clump),
            ExpertKind::Explore => Expert::Explore(Explore),
            ExpertKind::KeepDistance => Expert::KeepDistance(KeepDistance),
            ExpertKind::Mob => Expert::Mob(Mob),
            ExpertKind::Defend => Expert::Defend(Defend),
            ExpertKind::StayOffHill => Expert::StayOffHill(StayOffHill),
            ExpertKind::Unstuck => Expert::Unstuck(Unstuck),
            ExpertKind::Brownian => Expert::Brownian(Brownian::default()),
        }
    }

    pub fn kind(&self) -> ExpertKind {
        match self {
            Expert::Gather(_) => ExpertKind::Gather,
            Expert::GlomFood(_) => ExpertKind::GlomFood,
            Expert::GlomHill(_) => ExpertKind::GlomHill,
            Expert::Clump(_) => ExpertKind::Clump,
            Expert::Explore(_) => ExpertKind::Explore,
            Expert::KeepDistance(_) => ExpertKind::KeepDistance,
            Expert::Mob(_) => ExpertKind::Mob,
            Expert::Defend(_) => ExpertKind::Defend,
            Expert::StayOffHill(_) => ExpertKind::StayOffHill,
            Expert::Unstuck(_) => ExpertKind::Unstuck,
            Expert::Brownian(_) => ExpertKind::Brownian,
        }
    }

    /// Produce this turn's opinion.
    pub fn step(&mut self, view: &TurnView<'_>) -> Opinion {
        match self {
            Expert::Gather(expert) => expert.step(view),
            Expert::GlomFood(expert) => expert.step(view),
            Expert::GlomHill(expert) => expert.step(view),
            Expert::Clump(expert) => expert.step(view),
            Expert::Explore(expert) => expert.step(view),
            Expert::KeepDistance(expert) => expert.step(view),
            Expert::Mob(expert) => expert.step(view),
            Expert::Defend(expert) => expert.step(view),
            Expert::StayOffHill(expert) => expert.step(view),
            Expert::Unstuck(expert) => expert.step(view),
            Expert::Brownian(expert) => expert.step(view),
        }
    }
}

/// The usual two-axis approach, or `None` when already there.
pub(crate) fn approach(moves: [Move; 2], primary: f64) -> Option<MoveDistribution> {
    (moves[0] != Move::Stay).then(|| MoveDistribution::split(moves, primary))
}
