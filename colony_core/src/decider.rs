use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::EngineConfig;
use crate::engine::Deadline;
use crate::experts::{Expert, ExpertKind, TurnView};
use crate::geometry::{primary_axis_moves, Cell, Move};
use crate::learner::{LearnReport, OnlineLearner, Opinion};
use crate::reconcile::Reconciliation;
use crate::resolver::Resolution;
use crate::world::{Category, EntityId, WorldSnapshot};

/// Which move source drives the colony.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeciderKind {
    /// Hedge-weighted ensemble of the configured experts.
    #[default]
    Hedge,
    /// Random shuffle of all five moves per ant.
    Brownian,
    /// One goal per ant, chased until the ant stops gaining on it.
    Navigator,
}

impl DeciderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeciderKind::Hedge => "hedge",
            DeciderKind::Brownian => "brownian",
            DeciderKind::Navigator => "navigator",
        }
    }
}

impl fmt::Display for DeciderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeciderKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "hedge" => Ok(DeciderKind::Hedge),
            "brownian" => Ok(DeciderKind::Brownian),
            "navigator" => Ok(DeciderKind::Navigator),
            other => Err(format!(
                "unknown decider '{other}' (expected 'hedge', 'brownian' or 'navigator')"
            )),
        }
    }
}

/// Preferences for every entity plus how many experts got to speak.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Thought {
    pub preferences: BTreeMap<EntityId, Vec<Move>>,
    pub experts_run: usize,
    pub experts_skipped: usize,
}

#[derive(Clone, Debug)]
pub struct EnsembleDecider {
    experts: Vec<Expert>,
    learner: OnlineLearner,
}

impl EnsembleDecider {
    pub fn new(config: &EngineConfig) -> Self {
        let experts: Vec<Expert> = config.experts().iter().copied().map(Expert::new).collect();
        let learner = OnlineLearner::new(experts.len(), config.learner(), config.loss());
        Self { experts, learner }
    }

    pub fn expert_kinds(&self) -> Vec<ExpertKind> {
        self.experts.iter().map(Expert::kind).collect()
    }

    pub fn learner(&self) -> &OnlineLearner {
        &self.learner
    }

    fn think<R: Rng + ?Sized>(
        &mut self,
        view: &TurnView<'_>,
        deadline: &Deadline,
        rng: &mut R,
    ) -> Thought {
        let mut thought = Thought::default();
        let mut opinions = Vec::with_capacity(self.experts.len());
        for expert in &mut self.experts {
            if deadline.expired() {
                thought.experts_skipped += 1;
                opinions.push(Opinion::new());
                continue;
            }
            opinions.push(expert.step(view));
            thought.experts_run += 1;
        }
        if thought.experts_skipped > 0 {
            warn!(
                target: "colony::turn",
                skipped = thought.experts_skipped,
                "deadline reached; remaining experts abstained"
            );
        }
        let blended = self
            .learner
            .blend(&opinions, view.entities().map(|ant| ant.id));
        thought.preferences = self.learner.decide(&blended, rng);
        thought
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BrownianDecider;

impl BrownianDecider {
    fn think<R: Rng + ?Sized>(&mut self, view: &TurnView<'_>, rng: &mut R) -> Thought {
        let preferences = view
            .entities()
            .map(|ant| {
                let mut moves = Move::ALL.to_vec();
                moves.shuffle(rng);
                (ant.id, moves)
            })
            .collect();
        Thought {
            preferences,
            ..Thought::default()
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Pursuit {
    goal: Option<Cell>,
    /// Goals this ant failed to gain on; never picked again.
    abandoned: BTreeSet<Cell>,
}

/// Sends each ant after its own food, enemy ant or enemy hill. A goal is
/// kept while the ant got closer to it last turn, abandoned for good when
/// it did not, and forgotten when it disappears. Ants without a goal
/// wander.
#[derive(Clone, Debug, Default)]
pub struct NavigatorDecider {
    pursuits: BTreeMap<EntityId, Pursuit>,
}

impl NavigatorDecider {
    pub fn goal_of(&self, id: EntityId) -> Option<Cell> {
        self.pursuits.get(&id).and_then(|pursuit| pursuit.goal)
    }

    fn think<R: Rng + ?Sized>(&mut self, view: &TurnView<'_>, rng: &mut R) -> Thought {
        let world = view.world();
        let digest = view.digest();
        let mut open: BTreeSet<Cell> = world
            .cells(Category::Food)
            .chain(world.cells(Category::EnemyAnt))
            .chain(world.cells(Category::EnemyHill))
            .collect();

        let alive: BTreeSet<EntityId> = view.entities().map(|ant| ant.id).collect();
        self.pursuits.retain(|id, _| alive.contains(id));

        // kept goals are claimed before anyone picks a new one
        for ant in view.entities() {
            let pursuit = self.pursuits.entry(ant.id).or_default();
            let Some(goal) = pursuit.goal else {
                continue;
            };
            if !open.contains(&goal) {
                pursuit.goal = None;
                continue;
            }
            let (now, _) = digest.nearest(ant.cell, goal);
            let (before, _) = digest.nearest(ant.previous, goal);
            if now < before {
                open.remove(&goal);
            } else {
                pursuit.abandoned.insert(goal);
                pursuit.goal = None;
            }
        }

        let mut preferences = BTreeMap::new();
        for ant in view.entities() {
            let pursuit = self.pursuits.entry(ant.id).or_default();
            if pursuit.goal.is_none() {
                pursuit.goal = open
                    .iter()
                    .filter(|goal| !pursuit.abandoned.contains(*goal))
                    .map(|goal| (digest.nearest(ant.cell, *goal).0, *goal))
                    .min()
                    .map(|(_, goal)| goal);
                if let Some(goal) = pursuit.goal {
                    open.remove(&goal);
                }
            }
            let moves = match pursuit.goal {
                Some(goal) => {
                    let (_, image) = digest.nearest(ant.cell, goal);
                    let [first, second] = primary_axis_moves(ant.cell, image);
                    if first == second {
                        vec![first]
                    } else {
                        vec![first, second]
                    }
                }
                None => {
                    let mut moves = Move::CARDINAL.to_vec();
                    moves.shuffle(rng);
                    moves
                }
            };
            preferences.insert(ant.id, moves);
        }
        Thought {
            preferences,
            ..Thought::default()
        }
    }
}

/// The closed set of strategies behind one turn interface.
#[derive(Clone, Debug)]
pub enum Decider {
    Ensemble(EnsembleDecider),
    Brownian(BrownianDecider),
    Navigator(NavigatorDecider),
}

impl Decider {
    /// One-time setup once the game parameters are known.
    pub fn start(kind: DeciderKind, config: &EngineConfig) -> Self {
        match kind {
            DeciderKind::Hedge => Decider::Ensemble(EnsembleDecider::new(config)),
            DeciderKind::Brownian => Decider::Brownian(BrownianDecider),
            DeciderKind::Navigator => Decider::Navigator(NavigatorDecider::default()),
        }
    }

    pub fn kind(&self) -> DeciderKind {
        match self {
            Decider::Ensemble(_) => DeciderKind::Hedge,
            Decider::Brownian(_) => DeciderKind::Brownian,
            Decider::Navigator(_) => DeciderKind::Navigator,
        }
    }

    /// Feed back how last turn's decisions turned out.
    pub fn observe(
        &mut self,
        reconciliation: &Reconciliation,
        world: &WorldSnapshot,
    ) -> Option<LearnReport> {
        match self {
            Decider::Ensemble(ensemble) => Some(ensemble.learner.learn(reconciliation, world)),
            Decider::Brownian(_) | Decider::Navigator(_) => None,
        }
    }

    pub fn think<R: Rng + ?Sized>(
        &mut self,
        view: &TurnView<'_>,
        deadline: &Deadline,
        rng: &mut R,
    ) -> Thought {
        match self {
            Decider::Ensemble(ensemble) => ensemble.think(view, deadline, rng),
            Decider::Brownian(brownian) => brownian.think(view, rng),
            Decider::Navigator(navigator) => navigator.think(view, rng),
        }
    }

    /// Report which moves the resolver granted.
    pub fn resolved(&mut self, resolution: &Resolution) {
        if let Decider::Ensemble(ensemble) = self {
            ensemble.learner.record_resolution(resolution);
        }
    }

    /// Current expert trust, when this decider learns one.
    pub fn trust(&self) -> Option<Vec<f64>> {
        match self {
            Decider::Ensemble(ensemble) => Some(ensemble.learner.faith()),
            Decider::Brownian(_) | Decider::Navigator(_) => None,
        }
    }

    /// Drop anything decided during a turn that will not complete.
    pub fn abort(&mut self) {
        if let Decider::Ensemble(ensemble) = self {
            ensemble.learner.discard_pending();
        }
    }
}
