use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::experts::ExpertKind;
use crate::resolver::Blockers;

pub const BUILTIN_ENGINE_CONFIG: &str = include_str!("data/engine_config.json");
pub const ENGINE_CONFIG_PATH_ENV: &str = "COLONY_ENGINE_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    learner: LearnerConfig,
    loss: LossConfig,
    resolver: ResolverConfig,
    digest: DigestConfig,
    deadline: DeadlineConfig,
    experts: Vec<ExpertKind>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            learner: LearnerConfig::default(),
            loss: LossConfig::default(),
            resolver: ResolverConfig::default(),
            digest: DigestConfig::default(),
            deadline: DeadlineConfig::default(),
            experts: ExpertKind::ALL.to_vec(),
        }
    }
}

impl EngineConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_ENGINE_CONFIG)
                .expect("builtin engine config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, EngineConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, EngineConfigError> {
        let contents =
            fs::read_to_string(path).map_err(|source| EngineConfigError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        EngineConfig::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), EngineConfigError> {
        if !(0.0..=1.0).contains(&self.learner.beta) {
            return Err(EngineConfigError::Invalid(format!(
                "learner.beta must lie in [0, 1], got {}",
                self.learner.beta
            )));
        }
        if !(self.learner.initial_mass.is_finite() && self.learner.initial_mass > 0.0) {
            return Err(EngineConfigError::Invalid(
                "learner.initial_mass must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("loss.gained_food", self.loss.gained_food),
            ("loss.survived", self.loss.survived),
            ("loss.died", self.loss.died),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineConfigError::Invalid(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        if self.experts.len() > crate::distribution::ExpertSet::CAPACITY {
            return Err(EngineConfigError::Invalid(format!(
                "too many experts ({})",
                self.experts.len()
            )));
        }
        Ok(())
    }

    pub fn learner(&self) -> &LearnerConfig {
        &self.learner
    }

    pub fn loss(&self) -> LossConfig {
        self.loss
    }

    pub fn resolver(&self) -> &ResolverConfig {
        &self.resolver
    }

    pub fn digest(&self) -> &DigestConfig {
        &self.digest
    }

    pub fn deadline(&self) -> &DeadlineConfig {
        &self.deadline
    }

    pub fn experts(&self) -> &[ExpertKind] {
        &self.experts
    }

    pub fn with_experts(mut self, experts: Vec<ExpertKind>) -> Self {
        self.experts = experts;
        self
    }

    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }
}

#[derive(Debug, Error)]
pub enum EngineConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read engine config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid engine config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LearnerConfig {
    pub beta: f64,
    pub initial_mass: f64,
    pub blend_tolerance: f64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            beta: 0.9,
            initial_mass: 1000.0,
            blend_tolerance: 1e-9,
        }
    }
}

/// Per-entity loss for each observed outcome.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LossConfig {
    pub gained_food: f64,
    pub survived: f64,
    pub died: f64,
}

impl Default for LossConfig {
    fn default() -> Self {
        Self {
            gained_food: 0.0,
            survived: 0.1,
            died: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub food_blocks: bool,
}

impl ResolverConfig {
    pub fn blockers(&self) -> Blockers {
        if self.food_blocks {
            Blockers::WATER | Blockers::FOOD
        } else {
            Blockers::WATER
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { food_blocks: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DigestConfig {
    pub ray_step_limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeadlineConfig {
    pub safety_margin_ms: u64,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            safety_margin_ms: 100,
        }
    }
}

/// Where the active engine config came from; `None` means the builtin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfigMetadata {
    path: Option<PathBuf>,
}

impl EngineConfigMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

/// Load from `path`, falling back to the builtin config when reading or
/// parsing fails.
pub fn load_engine_config(path: Option<&Path>) -> (Arc<EngineConfig>, EngineConfigMetadata) {
    if let Some(path) = path {
        match EngineConfig::from_file(path) {
            Ok(config) => {
                tracing::info!(
                    target: "colony::config",
                    path = %path.display(),
                    "engine_config.loaded=file"
                );
                return (
                    Arc::new(config),
                    EngineConfigMetadata::new(Some(path.to_path_buf())),
                );
            }
            Err(err) => {
                tracing::warn!(
                    target: "colony::config",
                    path = %path.display(),
                    error = %err,
                    "engine_config.load_failed"
                );
            }
        }
    }

    let config = EngineConfig::builtin();
    tracing::info!(target: "colony::config", "engine_config.loaded=builtin");
    (config, EngineConfigMetadata::new(None))
}

pub fn load_engine_config_from_env() -> (Arc<EngineConfig>, EngineConfigMetadata) {
    let override_path = env::var(ENGINE_CONFIG_PATH_ENV).ok().map(PathBuf::from);
    load_engine_config(override_path.as_deref())
}
