//! Configuration for experience collection.

use std::fs;
use std::path::Path;

use pacing::course::CourseConfig;
use pacing::models::{Rider, RiderState};
use pacing::profiles::RiderParams;
use pacing::rewards::RewardBundle;
use pacing::simulation::{DEFAULT_AIR_DENSITY, DEFAULT_DT, Simulation};
use serde::{Deserialize, Serialize};

use crate::errors::ExperienceError;
use crate::exploration::EpsilonSchedule;

/// The rider's starting state and physical parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiderConfig {
    pub initial_state: RiderState,
    pub params: RiderParams,
}

impl Default for RiderConfig {
    fn default() -> Self {
        Self {
            initial_state: RiderState::new(0.0, 7.0, 100.0, 50_000.0),
            params: RiderParams::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Integration step in seconds.
    pub dt: f64,
    /// Air density in kg/m³.
    pub air_density: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: DEFAULT_DT,
            air_density: DEFAULT_AIR_DENSITY,
        }
    }
}

/// Parameters of the collection loop around the rollouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of sequential rollouts to run.
    pub rollouts: usize,
    pub epsilon: EpsilonSchedule,
    /// Requested batch size; clamped to the buffer length before sampling.
    pub batch_size: usize,
    /// Discount factor for Q-learning targets.
    pub discount: f64,
    /// Extend the cutoff time every this many rollouts (0 disables).
    pub cutoff_extension_every: usize,
    /// Seconds added to the cutoff time at each extension.
    pub cutoff_extension: f64,
    /// Independent parallel rollouts to run after the sequential ones.
    pub workers: usize,
    /// RNG seed for reproducible runs. Random when absent.
    pub seed: Option<u64>,
    /// Maximum transitions per rollout.
    pub step_limit: Option<usize>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            rollouts: 10_000,
            epsilon: EpsilonSchedule::default(),
            batch_size: 30,
            discount: 0.1,
            cutoff_extension_every: 100,
            cutoff_extension: 50.0,
            workers: 1,
            seed: None,
            step_limit: None,
        }
    }
}

/// Everything needed to build a simulation and collect experience from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceConfig {
    pub rider: RiderConfig,
    pub course: CourseConfig,
    pub simulation: SimulationConfig,
    pub rewards: RewardBundle,
    pub training: TrainingConfig,
}

impl ExperienceConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ExperienceError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ExperienceError> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ExperienceError> {
        self.rewards.validate()?;
        self.training.epsilon.validate()?;

        let training = &self.training;
        if training.batch_size == 0 {
            return Err(ExperienceError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&training.discount) {
            return Err(ExperienceError::InvalidConfig(format!(
                "discount must be within [0, 1], got {}",
                training.discount
            )));
        }
        if training.workers == 0 {
            return Err(ExperienceError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        if !training.cutoff_extension.is_finite() {
            return Err(ExperienceError::InvalidConfig(
                "cutoff_extension must be finite".to_string(),
            ));
        }

        // Building surfaces rider, course and simulation setting errors.
        self.build_simulation().map(|_| ())
    }

    /// Builds a fresh, independent simulation from this configuration.
    pub fn build_simulation(&self) -> Result<Simulation, ExperienceError> {
        let rider = Rider::new(self.rider.initial_state, self.rider.params)?;
        let course = self.course.build()?;
        Ok(Simulation::from_boxed(rider, course)
            .with_settings(self.simulation.dt, self.simulation.air_density)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacing::rewards::{Policy, SevereMistake};

    #[test]
    fn test_default_config_is_valid() {
        let config = ExperienceConfig::default();
        assert!(config.validate().is_ok());
        let sim = config.build_simulation().unwrap();
        assert!((sim.course().length() - 500.0).abs() < 1e-12);
        assert_eq!(sim.rider().state().velocity, 7.0);
    }

    #[test]
    fn test_json_round_trip() {
        let config = ExperienceConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed = ExperienceConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "course": { "kind": "flat", "length": 200.0 },
            "rewards": {
                "policies": [
                    { "reward": { "kind": "milestones", "base_reward": 1.0, "spacing": 5.0 } },
                    { "severe": { "kind": "cutoff_time", "cutoff_time": 60.0 } },
                    { "severe": { "kind": "going_backwards" } }
                ],
                "severe_mistake_penalty": -50.0
            },
            "training": { "rollouts": 3, "seed": 9 }
        }"#;
        let config = ExperienceConfig::from_json_str(json).unwrap();
        assert_eq!(config.training.rollouts, 3);
        assert_eq!(config.training.seed, Some(9));
        assert_eq!(config.training.batch_size, 30);
        assert_eq!(config.rewards.cutoff_time(), Some(60.0));
        assert_eq!(
            config.rewards.policies[2],
            Policy::Severe(SevereMistake::GoingBackwards)
        );
        assert_eq!(config.rider, RiderConfig::default());
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut config = ExperienceConfig::default();
        config.training.batch_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ExperienceError::InvalidConfig(_))
        ));

        let mut config = ExperienceConfig::default();
        config.training.epsilon = EpsilonSchedule::Constant { epsilon: 2.0 };
        assert!(matches!(
            config.validate(),
            Err(ExperienceError::InvalidEpsilon(_))
        ));

        let mut config = ExperienceConfig::default();
        config.course = CourseConfig::Flat { length: -5.0 };
        assert!(matches!(config.validate(), Err(ExperienceError::Pacing(_))));

        let mut config = ExperienceConfig::default();
        config.simulation.dt = 0.0;
        assert!(config.validate().is_err());
    }
}
