//! The per-turn pipeline: reconcile, perceive, decide, resolve.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use colony_proto::{GameParameters, Order, ParameterError};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::config::EngineConfig;
use crate::decider::{Decider, DeciderKind};
use crate::digest::SpatialDigest;
use crate::experts::TurnView;
use crate::geometry::{wrap, Cell, Size};
use crate::metrics::TurnMetrics;
use crate::reconcile::Reconciler;
use crate::resolver::{MoveRequest, MoveResolver, Resolution};
use crate::world::{SensorReport, WorldSnapshot};

/// Wall-clock bound for optional work within a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline {
    expires_at: Option<Instant>,
}

impl Deadline {
    pub fn never() -> Self {
        Self { expires_at: None }
    }

    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now().checked_add(budget),
        }
    }

    pub fn expired_now() -> Self {
        Self {
            expires_at: Some(Instant::now()),
        }
    }

    pub fn expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Instant::now() >= expires_at)
    }
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub orders: Vec<Order>,
    pub resolution: Resolution,
    pub metrics: TurnMetrics,
}

/// Owns all cross-turn state: entity identities, committed plans, cumulative
/// water, expert trust and the random stream.
#[derive(Debug)]
pub struct TurnEngine {
    params: GameParameters,
    config: Arc<EngineConfig>,
    size: Size,
    water: BTreeSet<Cell>,
    reconciler: Reconciler,
    digest: SpatialDigest,
    decider: Decider,
    resolver: MoveResolver,
    rng: ChaCha8Rng,
    turn: u64,
}

impl TurnEngine {
    pub fn start(
        params: GameParameters,
        config: Arc<EngineConfig>,
        kind: DeciderKind,
    ) -> Result<Self, ParameterError> {
        params.validate()?;
        let size = Size::new(params.rows as i32, params.cols as i32);
        let digest = SpatialDigest::new(
            WorldSnapshot::new(size),
            params.view_radius() as i32,
            config.digest().ray_step_limit,
        );
        let decider = Decider::start(kind, &config);
        let resolver = MoveResolver::new(config.resolver().blockers());
        let rng = ChaCha8Rng::seed_from_u64(params.player_seed);
        debug!(
            target: "colony::turn",
            rows = params.rows,
            cols = params.cols,
            view_radius = params.view_radius(),
            decider = %kind,
            seed = params.player_seed,
            "engine.started"
        );
        Ok(Self {
            params,
            config,
            size,
            water: BTreeSet::new(),
            reconciler: Reconciler::new(size),
            digest,
            decider,
            resolver,
            rng,
            turn: 0,
        })
    }

    pub fn params(&self) -> &GameParameters {
        &self.params
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn decider(&self) -> &Decider {
        &self.decider
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn digest(&self) -> &SpatialDigest {
        &self.digest
    }

    pub fn water(&self) -> &BTreeSet<Cell> {
        &self.water
    }

    /// Deadline for a turn starting now.
    pub fn turn_deadline(&self) -> Deadline {
        let budget = self
            .params
            .turn_time_ms
            .saturating_sub(self.config.deadline().safety_margin_ms);
        Deadline::after(Duration::from_millis(budget))
    }

    pub fn run_turn(&mut self, report: &SensorReport) -> TurnOutcome {
        let deadline = self.turn_deadline();
        self.run_turn_until(report, deadline)
    }

    pub fn run_turn_until(&mut self, report: &SensorReport, deadline: Deadline) -> TurnOutcome {
        let started = Instant::now();
        self.turn += 1;
        let size = self.size;
        self.water
            .extend(report.water.iter().map(|cell| wrap(*cell, size)));

        let reconciliation = self
            .reconciler
            .reconcile(&report.my_ants(), &report.my_dead());
        let world = WorldSnapshot::from_report(
            size,
            &self.water,
            report,
            reconciliation.ants.iter().copied(),
            reconciliation.dead_entities(),
        );
        let learned = self.decider.observe(&reconciliation, &world);
        self.digest.refresh(world);

        let view = TurnView::new(&self.digest, self.params.attack_radius() as i32);
        let mut thought = self.decider.think(&view, &deadline, &mut self.rng);
        let requests: Vec<MoveRequest> = self
            .digest
            .world()
            .entities()
            .map(|ant| match thought.preferences.remove(&ant.id) {
                Some(moves) => MoveRequest::new(ant.id, ant.cell, moves),
                None => MoveRequest::stay(ant.id, ant.cell),
            })
            .collect();

        let resolution = self.resolver.resolve(self.digest.world(), requests);
        self.decider.resolved(&resolution);
        self.reconciler.commit(resolution.plans.clone());
        let orders = resolution.orders();

        let diagnostics = !deadline.expired();
        let metrics = TurnMetrics {
            turn: self.turn,
            ants: reconciliation.ants.len(),
            births: reconciliation.births.len(),
            deaths: reconciliation.deaths.len(),
            blocked: reconciliation.blocked.len(),
            orders: orders.len(),
            evictions: resolution.evictions,
            rejections: resolution.rejections,
            experts_run: thought.experts_run,
            experts_skipped: thought.experts_skipped,
            attributed_losses: learned.map_or(0, |report| report.attributed),
            elapsed_us: started.elapsed().as_micros() as u64,
            digest: diagnostics.then(|| self.digest.stats()),
            trust: if diagnostics {
                self.decider.trust()
            } else {
                None
            },
        };
        metrics.log();

        TurnOutcome {
            orders,
            resolution,
            metrics,
        }
    }

    /// Abandon the current turn. Identities, committed plans and trust
    /// survive; cached perception and undecided learning do not.
    pub fn abort_turn(&mut self) {
        self.digest.clear_caches();
        self.decider.abort();
        debug!(target: "colony::turn", turn = self.turn, "turn.aborted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::experts::ExpertKind;

    fn params(rows: u64, cols: u64, view_radius2: u64) -> GameParameters {
        GameParameters {
            rows,
            cols,
            view_radius2,
            ..GameParameters::default()
        }
    }

    #[test]
    fn start_rejects_empty_board() {
        let err = TurnEngine::start(
            GameParameters::default(),
            EngineConfig::builtin(),
            DeciderKind::Hedge,
        )
        .expect_err("zero-sized board must fail");
        assert!(matches!(err, ParameterError::EmptyBoard { .. }));
    }

    #[test]
    fn lone_gatherer_steps_toward_food() {
        let config = Arc::new(EngineConfig::default().with_experts(vec![ExpertKind::Gather]));
        let mut engine =
            TurnEngine::start(params(10, 10, 9), config, DeciderKind::Hedge).expect("start");
        let report = SensorReport::new()
            .with_ant(Cell::new(0, 0), 0)
            .with_food(Cell::new(0, 2));
        let outcome = engine.run_turn_until(&report, Deadline::never());
        assert_eq!(
            outcome.orders.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["o 0 0 E".to_string()]
        );
        assert_eq!(outcome.metrics.births, 1);
    }

    #[test]
    fn food_blocking_follows_the_resolver_config() {
        let report = SensorReport::new()
            .with_ant(Cell::new(0, 0), 0)
            .with_food(Cell::new(0, 1));
        let gather_only = EngineConfig::default().with_experts(vec![ExpertKind::Gather]);

        let mut engine = TurnEngine::start(
            params(10, 10, 9),
            Arc::new(gather_only.clone()),
            DeciderKind::Hedge,
        )
        .expect("start");
        let outcome = engine.run_turn_until(&report, Deadline::never());
        assert!(outcome.orders.is_empty());

        let walk_onto_food = gather_only.with_resolver(ResolverConfig { food_blocks: false });
        let mut engine =
            TurnEngine::start(params(10, 10, 9), Arc::new(walk_onto_food), DeciderKind::Hedge)
                .expect("start");
        let outcome = engine.run_turn_until(&report, Deadline::never());
        assert_eq!(
            outcome.orders.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["o 0 0 E".to_string()]
        );
    }

    #[test]
    fn navigator_drives_the_engine() {
        let mut engine = TurnEngine::start(
            params(10, 10, 9),
            EngineConfig::builtin(),
            DeciderKind::Navigator,
        )
        .expect("start");
        let report = SensorReport::new()
            .with_ant(Cell::new(0, 0), 0)
            .with_food(Cell::new(0, 2));
        let outcome = engine.run_turn_until(&report, Deadline::never());
        assert_eq!(
            outcome.orders.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["o 0 0 E".to_string()]
        );
        assert_eq!(engine.decider().kind(), DeciderKind::Navigator);
        assert!(outcome.metrics.trust.is_none());
    }

    #[test]
    fn water_accumulates_across_turns() {
        let mut engine = TurnEngine::start(
            params(10, 10, 9),
            EngineConfig::builtin(),
            DeciderKind::Hedge,
        )
        .expect("start");
        engine.run_turn_until(&SensorReport::new().with_water(Cell::new(3, 3)), Deadline::never());
        engine.run_turn_until(&SensorReport::new().with_water(Cell::new(4, 4)), Deadline::never());
        assert_eq!(engine.water().len(), 2);
        assert!(engine.digest().world().is_water(Cell::new(3, 3)));
    }

    #[test]
    fn expired_deadline_still_yields_a_turn() {
        let mut engine = TurnEngine::start(
            params(10, 10, 9),
            EngineConfig::builtin(),
            DeciderKind::Hedge,
        )
        .expect("start");
        let report = SensorReport::new().with_ant(Cell::new(5, 5), 0);
        let outcome = engine.run_turn_until(&report, Deadline::expired_now());
        assert!(outcome.orders.is_empty());
        assert!(outcome.metrics.digest.is_none());
        assert_eq!(outcome.metrics.experts_run, 0);
        assert_eq!(outcome.resolution.plans.len(), 1);
    }

    #[test]
    fn abort_keeps_identity_and_trust() {
        let mut engine = TurnEngine::start(
            params(10, 10, 9),
            EngineConfig::builtin(),
            DeciderKind::Hedge,
        )
        .expect("start");
        let report = SensorReport::new().with_ant(Cell::new(5, 5), 0);
        engine.run_turn_until(&report, Deadline::expired_now());
        let trust = engine.decider().trust();
        engine.abort_turn();
        assert_eq!(engine.decider().trust(), trust);
        assert_eq!(engine.reconciler().next_id(), 1);
        assert_eq!(engine.reconciler().outstanding().len(), 1);
    }
}
