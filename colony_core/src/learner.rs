//! Hedge ensemble over expert opinions.
//!
//! Each turn the learner blends every expert's opinion by the current trust,
//! samples one move per ant and remembers which experts backed it. When the
//! next turn shows how those ants fared, backers of bad moves lose trust.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::config::{LearnerConfig, LossConfig};
use crate::distribution::{BlendedDistribution, ExpertSet, MoveDistribution};
use crate::geometry::{neighbors4, wrap, Cell, Move, Size};
use crate::reconcile::Reconciliation;
use crate::resolver::Resolution;
use crate::world::{EntityId, WorldSnapshot};

/// One expert's move preferences per entity. A missing entity is an
/// abstention.
pub type Opinion = BTreeMap<EntityId, MoveDistribution>;

/// Multiplicative weights over a fixed set of experts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Hedge {
    beta: f64,
    weights: Vec<f64>,
}

impl Hedge {
    pub fn new(beta: f64, count: usize, initial_mass: f64) -> Self {
        assert!((0.0..=1.0).contains(&beta), "hedge beta {beta} outside [0, 1]");
        assert!(
            initial_mass.is_finite() && initial_mass > 0.0,
            "hedge initial mass must be positive"
        );
        Self {
            beta,
            weights: vec![initial_mass; count],
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Trust normalised to sum to one. Falls back to uniform if every weight
    /// has decayed to zero.
    pub fn faith(&self) -> Vec<f64> {
        let total: f64 = self.weights.iter().sum();
        if total > 0.0 && total.is_finite() {
            self.weights.iter().map(|weight| weight / total).collect()
        } else if self.weights.is_empty() {
            Vec::new()
        } else {
            vec![1.0 / self.weights.len() as f64; self.weights.len()]
        }
    }

    /// `w_i *= beta^loss_i` with each loss clamped to `[0, 1]`.
    pub fn punish(&mut self, losses: &[f64]) {
        assert_eq!(
            losses.len(),
            self.weights.len(),
            "one loss per expert is required"
        );
        for (weight, loss) in self.weights.iter_mut().zip(losses) {
            let loss = if loss.is_nan() { 1.0 } else { loss.clamp(0.0, 1.0) };
            *weight *= self.beta.powf(loss);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct PendingDecision {
    sampled: Move,
    blame: ExpertSet,
    realized: Option<Move>,
}

/// Outcome of one learning step.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LearnReport {
    pub losses: Vec<f64>,
    pub attributed: usize,
    pub skipped: usize,
}

#[derive(Clone, Debug)]
pub struct OnlineLearner {
    hedge: Hedge,
    tolerance: f64,
    loss: LossConfig,
    pending: BTreeMap<EntityId, PendingDecision>,
    food_seen: BTreeSet<Cell>,
}

impl OnlineLearner {
    pub fn new(experts: usize, config: &LearnerConfig, loss: LossConfig) -> Self {
        assert!(
            experts <= ExpertSet::CAPACITY,
            "at most {} experts are supported",
            ExpertSet::CAPACITY
        );
        Self {
            hedge: Hedge::new(config.beta, experts, config.initial_mass),
            tolerance: config.blend_tolerance,
            loss,
            pending: BTreeMap::new(),
            food_seen: BTreeSet::new(),
        }
    }

    pub fn hedge(&self) -> &Hedge {
        &self.hedge
    }

    pub fn faith(&self) -> Vec<f64> {
        self.hedge.faith()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Blend `opinions` (one per expert, in expert order) for every id.
    ///
    /// # Panics
    ///
    /// Panics on a negative or non-finite expert weight, or a blend whose
    /// mass exceeds one beyond the configured tolerance.
    pub fn blend(
        &self,
        opinions: &[Opinion],
        ids: impl IntoIterator<Item = EntityId>,
    ) -> BTreeMap<EntityId, BlendedDistribution> {
        assert_eq!(opinions.len(), self.hedge.len(), "one opinion per expert");
        let faith = self.hedge.faith();
        ids.into_iter()
            .map(|id| {
                let mut blended = BlendedDistribution::default();
                for (expert, (opinion, trust)) in opinions.iter().zip(&faith).enumerate() {
                    let Some(dist) = opinion.get(&id) else {
                        continue;
                    };
                    assert!(
                        dist.is_well_formed(),
                        "expert {expert} produced a malformed distribution for {id}: {dist:?}"
                    );
                    blended.contribute(expert, *trust, dist);
                }
                assert!(
                    blended.mass() <= 1.0 + self.tolerance,
                    "blended distribution for {id} has mass {}",
                    blended.mass()
                );
                (id, blended)
            })
            .collect()
    }

    /// Sample one move per entity and return its preference list. The
    /// decision is remembered for the next call to [`Self::learn`].
    pub fn decide<R: Rng + ?Sized>(
        &mut self,
        blended: &BTreeMap<EntityId, BlendedDistribution>,
        rng: &mut R,
    ) -> BTreeMap<EntityId, Vec<Move>> {
        blended
            .iter()
            .map(|(id, blend)| {
                let sampled = blend.sample(rng.gen::<f64>());
                self.pending.insert(
                    *id,
                    PendingDecision {
                        sampled,
                        blame: blend.blame(sampled),
                        realized: None,
                    },
                );
                (*id, blend.preferences(sampled))
            })
            .collect()
    }

    /// Note which move the resolver actually granted each entity.
    pub fn record_resolution(&mut self, resolution: &Resolution) {
        for plan in resolution.plans.values() {
            if let Some(pending) = self.pending.get_mut(&plan.id) {
                pending.realized = Some(plan.mv);
            }
        }
    }

    /// Score last turn's decisions against this turn's reconciliation and
    /// update expert trust.
    pub fn learn(&mut self, reconciliation: &Reconciliation, world: &WorldSnapshot) -> LearnReport {
        let size = world.size();
        let died: BTreeSet<EntityId> = reconciliation.deaths.iter().map(|d| d.id).collect();
        let blocked: BTreeSet<EntityId> = reconciliation.blocked.iter().copied().collect();
        let positions: BTreeMap<EntityId, Cell> = reconciliation
            .ants
            .iter()
            .map(|ant| (ant.id, ant.cell))
            .collect();

        let experts = self.hedge.len();
        let mut totals = vec![0.0; experts];
        let mut counts = vec![0usize; experts];
        let mut report = LearnReport::default();

        for (id, pending) in std::mem::take(&mut self.pending) {
            if pending.realized != Some(pending.sampled) || blocked.contains(&id) {
                report.skipped += 1;
                continue;
            }
            let loss = if died.contains(&id) {
                self.loss.died
            } else if let Some(cell) = positions.get(&id) {
                if self.beside_food(*cell, size) {
                    self.loss.gained_food
                } else {
                    self.loss.survived
                }
            } else {
                report.skipped += 1;
                continue;
            };
            report.attributed += 1;
            for expert in pending.blame.iter() {
                totals[expert] += loss;
                counts[expert] += 1;
            }
        }

        report.losses = totals
            .iter()
            .zip(&counts)
            .map(|(total, count)| if *count == 0 { 0.0 } else { total / *count as f64 })
            .collect();
        self.hedge.punish(&report.losses);
        self.food_seen = world.food().clone();

        debug!(
            target: "colony::learner",
            attributed = report.attributed,
            skipped = report.skipped,
            faith = ?self.hedge.faith(),
            "learner.updated"
        );
        report
    }

    /// Forget decisions made during an aborted turn.
    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }

    fn beside_food(&self, cell: Cell, size: Size) -> bool {
        neighbors4(cell)
            .into_iter()
            .any(|neighbor| self.food_seen.contains(&wrap(neighbor, size)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::Death;
    use crate::resolver::Plan;
    use crate::world::Entity;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn config() -> LearnerConfig {
        LearnerConfig::default()
    }

    fn ant(id: u32, row: i32, col: i32) -> Entity {
        Entity {
            id: EntityId(id),
            cell: Cell::new(row, col),
            previous: Cell::new(row, col),
        }
    }

    fn grant_all(learner: &mut OnlineLearner, prefs: &BTreeMap<EntityId, Vec<Move>>, cells: &BTreeMap<EntityId, Cell>) {
        let mut resolution = Resolution::default();
        for (id, moves) in prefs {
            let origin = cells[id];
            let target = crate::geometry::displace(moves[0], origin);
            resolution.plans.insert(
                target,
                Plan {
                    id: *id,
                    origin,
                    target,
                    mv: moves[0],
                },
            );
        }
        learner.record_resolution(&resolution);
    }

    #[test]
    fn hedge_starts_uniform_and_decays() {
        let mut hedge = Hedge::new(0.9, 3, 1000.0);
        assert_eq!(hedge.faith(), vec![1.0 / 3.0; 3]);
        hedge.punish(&[0.0, 1.0, 2.0]);
        assert_eq!(hedge.weights(), &[1000.0, 900.0, 900.0]);
    }

    #[test]
    fn zero_loss_expert_never_loses_relative_trust() {
        let mut hedge = Hedge::new(0.9, 2, 1000.0);
        let mut previous = hedge.faith()[0];
        for _ in 0..50 {
            hedge.punish(&[0.0, 1.0]);
            let faith = hedge.faith();
            assert!(faith[0] >= previous);
            assert!(faith[0] >= faith[1]);
            previous = faith[0];
        }
    }

    #[test]
    #[should_panic(expected = "malformed distribution")]
    fn negative_expert_weight_is_fatal() {
        let learner = OnlineLearner::new(1, &config(), LossConfig::default());
        let opinion: Opinion = [(EntityId(0), MoveDistribution::empty().with(Move::North, -0.5))]
            .into_iter()
            .collect();
        learner.blend(&[opinion], [EntityId(0)]);
    }

    #[test]
    #[should_panic(expected = "has mass")]
    fn overweight_blend_is_fatal() {
        let learner = OnlineLearner::new(1, &config(), LossConfig::default());
        let opinion: Opinion = [(
            EntityId(0),
            MoveDistribution::certain(Move::North).with(Move::East, 0.5),
        )]
        .into_iter()
        .collect();
        learner.blend(&[opinion], [EntityId(0)]);
    }

    #[test]
    fn abstaining_experts_leave_entity_at_stay() {
        let mut learner = OnlineLearner::new(2, &config(), LossConfig::default());
        let blended = learner.blend(&[Opinion::new(), Opinion::new()], [EntityId(3)]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let prefs = learner.decide(&blended, &mut rng);
        assert_eq!(prefs[&EntityId(3)], vec![Move::Stay]);
    }

    #[test]
    fn deaths_shift_trust_to_the_other_expert() {
        let mut learner = OnlineLearner::new(2, &config(), LossConfig::default());
        let reckless: Opinion = [(EntityId(0), MoveDistribution::certain(Move::North))]
            .into_iter()
            .collect();
        let careful: Opinion = [(EntityId(1), MoveDistribution::certain(Move::South))]
            .into_iter()
            .collect();
        let blended = learner.blend(&[reckless, careful], [EntityId(0), EntityId(1)]);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let prefs = learner.decide(&blended, &mut rng);
        assert_eq!(prefs[&EntityId(0)][0], Move::North);
        assert_eq!(prefs[&EntityId(1)][0], Move::South);

        let cells = [(EntityId(0), Cell::new(5, 5)), (EntityId(1), Cell::new(2, 2))]
            .into_iter()
            .collect();
        grant_all(&mut learner, &prefs, &cells);

        let reconciliation = Reconciliation {
            ants: vec![ant(1, 3, 2)],
            deaths: vec![Death {
                id: EntityId(0),
                cell: Cell::new(4, 5),
            }],
            ..Reconciliation::default()
        };
        let world = WorldSnapshot::new(Size::new(10, 10));
        let report = learner.learn(&reconciliation, &world);
        assert_eq!(report.attributed, 2);
        assert_eq!(report.losses, vec![1.0, 0.1]);
        let faith = learner.faith();
        assert!(faith[1] > faith[0]);
    }

    #[test]
    fn overridden_moves_are_not_scored() {
        let mut learner = OnlineLearner::new(1, &config(), LossConfig::default());
        let opinion: Opinion = [(EntityId(0), MoveDistribution::certain(Move::East))]
            .into_iter()
            .collect();
        let blended = learner.blend(&[opinion], [EntityId(0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        learner.decide(&blended, &mut rng);

        let mut resolution = Resolution::default();
        resolution.plans.insert(
            Cell::new(1, 1),
            Plan {
                id: EntityId(0),
                origin: Cell::new(1, 1),
                target: Cell::new(1, 1),
                mv: Move::Stay,
            },
        );
        learner.record_resolution(&resolution);

        let reconciliation = Reconciliation {
            ants: vec![ant(0, 1, 1)],
            ..Reconciliation::default()
        };
        let report = learner.learn(&reconciliation, &WorldSnapshot::new(Size::new(10, 10)));
        assert_eq!(report.attributed, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(learner.hedge().weights(), &[1000.0]);
    }

    #[test]
    fn stepping_beside_remembered_food_costs_nothing() {
        let mut learner = OnlineLearner::new(1, &config(), LossConfig::default());
        let mut world = WorldSnapshot::new(Size::new(10, 10));
        world.insert_food(Cell::new(0, 2));
        // first learn call only records the food seen this turn
        learner.learn(&Reconciliation::default(), &world);

        let opinion: Opinion = [(EntityId(0), MoveDistribution::certain(Move::East))]
            .into_iter()
            .collect();
        let blended = learner.blend(&[opinion], [EntityId(0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let prefs = learner.decide(&blended, &mut rng);
        let cells = [(EntityId(0), Cell::new(0, 0))].into_iter().collect();
        grant_all(&mut learner, &prefs, &cells);

        let reconciliation = Reconciliation {
            ants: vec![Entity {
                id: EntityId(0),
                cell: Cell::new(0, 1),
                previous: Cell::new(0, 0),
            }],
            ..Reconciliation::default()
        };
        let report = learner.learn(&reconciliation, &WorldSnapshot::new(Size::new(10, 10)));
        assert_eq!(report.losses, vec![0.0]);
    }
}
