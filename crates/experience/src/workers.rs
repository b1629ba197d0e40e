//! Independent rollouts run in parallel, one simulation per worker.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::config::ExperienceConfig;
use crate::errors::ExperienceError;
use crate::exploration::{ActionValueEstimator, EpsilonGreedy};
use crate::replay::ExperienceReplay;
use crate::rollout::{Rollout, RolloutStats, RolloutSummary};

/// The episode one worker produced.
#[derive(Debug, Clone)]
pub struct WorkerRollout {
    pub worker: usize,
    pub summary: RolloutSummary,
    pub replay: ExperienceReplay,
}

/// Runs `workers` independent rollouts concurrently.
///
/// Each worker builds its own simulation, reward bundle, buffer and RNG (seeded
/// with `seed + worker`); only the estimator is shared. Results are ordered by
/// worker.
pub fn run_independent_rollouts<E>(
    config: &ExperienceConfig,
    estimator: &E,
    epsilon: f64,
    workers: usize,
    seed: u64,
) -> Result<Vec<WorkerRollout>, ExperienceError>
where
    E: ActionValueEstimator + Sync + ?Sized,
{
    config.validate()?;
    let policy = EpsilonGreedy::new(epsilon)?;

    (0..workers)
        .into_par_iter()
        .map(|worker| -> Result<WorkerRollout, ExperienceError> {
            let mut simulation = config.build_simulation()?;
            let rewards = config.rewards.clone();
            let mut replay = ExperienceReplay::new();
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(worker as u64));

            let summary = Rollout::new(&mut simulation, &rewards, estimator)
                .with_step_limit(config.training.step_limit)
                .run(&mut replay, &policy, &mut rng);

            Ok(WorkerRollout {
                worker,
                summary,
                replay,
            })
        })
        .collect()
}

/// Aggregates the outcomes of parallel rollouts.
pub fn summarize(rollouts: &[WorkerRollout]) -> RolloutStats {
    let mut stats = RolloutStats::default();
    for rollout in rollouts {
        stats.record(&rollout.summary);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::LinearEstimator;
    use pacing::course::CourseConfig;

    #[test]
    fn test_workers_are_independent_and_reproducible() {
        let mut config = ExperienceConfig::default();
        config.course = CourseConfig::Flat { length: 40.0 };
        config.rider.initial_state.an_energy = 1_000_000.0;
        let estimator = LinearEstimator::favoring(0);

        let first = run_independent_rollouts(&config, &estimator, 0.3, 4, 99).unwrap();
        let second = run_independent_rollouts(&config, &estimator, 0.3, 4, 99).unwrap();

        assert_eq!(first.len(), 4);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.worker, b.worker);
            assert_eq!(a.replay, b.replay);
        }
        assert_eq!(summarize(&first).rollouts, 4);
    }

    #[test]
    fn test_rejects_invalid_epsilon() {
        let config = ExperienceConfig::default();
        let estimator = LinearEstimator::zeros();
        assert!(matches!(
            run_independent_rollouts(&config, &estimator, 1.2, 2, 0),
            Err(ExperienceError::InvalidEpsilon(_))
        ));
    }
}
