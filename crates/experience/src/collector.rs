//! Sequential experience collection following a training schedule.

use pacing::rewards::RewardBundle;
use pacing::simulation::Simulation;
use rand::Rng;
use tracing::info;

use crate::config::{ExperienceConfig, TrainingConfig};
use crate::errors::ExperienceError;
use crate::exploration::ActionValueEstimator;
use crate::replay::{Batch, ExperienceReplay};
use crate::rollout::{Rollout, RolloutStats, RolloutSummary};

/// Result of one scheduled rollout.
#[derive(Debug, Clone)]
pub struct CollectedRollout {
    /// Zero-based rollout number within the run.
    pub index: usize,
    pub summary: RolloutSummary,
    /// Training batch including the terminal transition; `None` for an empty episode.
    pub batch: Option<Batch>,
}

/// Owns one simulation, reward bundle and buffer and runs rollouts against an
/// externally trained estimator, applying the epsilon decay and cutoff
/// extension schedules between rollouts.
///
/// The caller trains its estimator between calls to [`ExperienceCollector::next_rollout`].
pub struct ExperienceCollector {
    simulation: Simulation,
    rewards: RewardBundle,
    replay: ExperienceReplay,
    training: TrainingConfig,
    stats: RolloutStats,
    completed: usize,
}

impl ExperienceCollector {
    pub fn new(config: &ExperienceConfig) -> Result<Self, ExperienceError> {
        config.validate()?;
        Ok(Self {
            simulation: config.build_simulation()?,
            rewards: config.rewards.clone(),
            replay: ExperienceReplay::new(),
            training: config.training.clone(),
            stats: RolloutStats::default(),
            completed: 0,
        })
    }

    /// True once the configured number of rollouts has run.
    pub fn is_done(&self) -> bool {
        self.completed >= self.training.rollouts
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn rewards(&self) -> &RewardBundle {
        &self.rewards
    }

    pub fn replay(&self) -> &ExperienceReplay {
        &self.replay
    }

    pub fn stats(&self) -> &RolloutStats {
        &self.stats
    }

    /// Runs the next rollout and samples a training batch from it.
    pub fn next_rollout<E>(
        &mut self,
        estimator: &E,
        rng: &mut impl Rng,
    ) -> Result<CollectedRollout, ExperienceError>
    where
        E: ActionValueEstimator + ?Sized,
    {
        let index = self.completed;
        let policy = self.training.epsilon.policy_at(index)?;

        let summary = Rollout::new(&mut self.simulation, &self.rewards, estimator)
            .with_step_limit(self.training.step_limit)
            .run(&mut self.replay, &policy, rng);
        self.stats.record(&summary);

        let batch = if self.replay.is_empty() {
            None
        } else {
            let size = self.training.batch_size.min(self.replay.len());
            Some(self.replay.sample_batch_plus_last(size, rng)?)
        };

        let every = self.training.cutoff_extension_every;
        if every > 0 && index % every == 0 {
            self.rewards.extend_cutoff(self.training.cutoff_extension);
            info!(
                rollout = index,
                cutoff_time = ?self.rewards.cutoff_time(),
                epsilon = policy.epsilon(),
                "Extended cutoff time"
            );
        }

        self.completed += 1;
        Ok(CollectedRollout {
            index,
            summary,
            batch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::LinearEstimator;
    use crate::exploration::EpsilonSchedule;
    use pacing::course::CourseConfig;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn config() -> ExperienceConfig {
        let mut config = ExperienceConfig::default();
        config.course = CourseConfig::Flat { length: 60.0 };
        config.rider.initial_state.an_energy = 1_000_000.0;
        config.training.rollouts = 4;
        config.training.batch_size = 8;
        config.training.cutoff_extension_every = 2;
        config.training.cutoff_extension = 10.0;
        config.training.epsilon = EpsilonSchedule::Linear {
            start: 0.5,
            rollouts: 4,
        };
        config
    }

    #[test]
    fn test_runs_configured_number_of_rollouts() {
        let mut collector = ExperienceCollector::new(&config()).unwrap();
        let estimator = LinearEstimator::favoring(0);
        let mut rng = StdRng::seed_from_u64(21);

        let mut epsilons = Vec::new();
        while !collector.is_done() {
            let collected = collector.next_rollout(&estimator, &mut rng).unwrap();
            let batch = collected.batch.unwrap();
            assert!(batch.len() <= 8);
            let last = collector.replay().last().unwrap();
            assert!(batch.start_observations.contains(&last.start_observation));
            epsilons.push(collected.summary.epsilon);
        }

        assert_eq!(collector.completed(), 4);
        assert_eq!(collector.stats().rollouts, 4);
        assert_eq!(epsilons, vec![0.5, 0.375, 0.25, 0.125]);
        // Extended after rollouts 0 and 2.
        assert_eq!(collector.rewards().cutoff_time(), Some(520.0));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut bad = config();
        bad.training.workers = 0;
        assert!(ExperienceCollector::new(&bad).is_err());
    }
}
