//! Turn engine for the colony bot.
//!
//! Each turn flows through the same stages, leaves first: the
//! [`Reconciler`] gives reported ants stable identities, the
//! [`SpatialDigest`] answers perception queries for the experts, the
//! [`OnlineLearner`] blends the experts' opinions and samples one move per
//! ant, and the [`MoveResolver`] turns those preferences into a
//! collision-free set of orders. [`TurnEngine::run_turn`] drives one pass.

pub mod config;
pub mod decider;
pub mod digest;
pub mod distribution;
pub mod engine;
pub mod experts;
pub mod geometry;
pub mod learner;
pub mod metrics;
pub mod reconcile;
pub mod resolver;
pub mod session;
pub mod world;

pub use config::{
    load_engine_config, load_engine_config_from_env, EngineConfig, EngineConfigError,
    EngineConfigMetadata, LearnerConfig, LossConfig,
};
pub use decider::{Decider, DeciderKind, Thought};
pub use digest::{DigestStats, Goal, SpatialDigest};
pub use distribution::{BlendedDistribution, ExpertSet, MoveDistribution};
pub use engine::{Deadline, TurnEngine, TurnOutcome};
pub use experts::{Expert, ExpertKind, TurnView};
pub use geometry::{Cell, Move, Size};
pub use learner::{Hedge, OnlineLearner, Opinion};
pub use metrics::TurnMetrics;
pub use reconcile::{Death, Reconciler, Reconciliation};
pub use resolver::{Blockers, MoveRequest, MoveResolver, Plan, Resolution};
pub use session::{BotSession, SessionError};
pub use world::{Category, Entity, EntityId, SensorReport, WorldSnapshot};
