//! Action selection: the estimator interface and epsilon-greedy exploration.

use pacing::observation::Observation;
use rand::Rng;
use rand_distr::{Bernoulli, Distribution};
use serde::{Deserialize, Serialize};

use crate::errors::ExperienceError;

/// Largest action magnitude. Actions are integers in `-MAX_ACTION..=MAX_ACTION`.
pub const MAX_ACTION: i32 = 10;

/// Number of discrete actions, and the length of an estimator's output.
pub const NUM_ACTIONS: usize = 21;

/// Added to an action to get its estimator output index.
pub const ACTION_INDEX_OFFSET: i32 = MAX_ACTION;

/// Estimated value of each action, indexed by `action + ACTION_INDEX_OFFSET`.
pub type ActionValues = [f64; NUM_ACTIONS];

/// An action-value function approximator.
///
/// Training happens elsewhere; rollouts only ever read estimates.
pub trait ActionValueEstimator {
    fn estimate(&self, observation: &Observation) -> ActionValues;
}

impl<F> ActionValueEstimator for F
where
    F: Fn(&Observation) -> ActionValues,
{
    fn estimate(&self, observation: &Observation) -> ActionValues {
        self(observation)
    }
}

/// Output index of `action`.
pub fn action_index(action: i32) -> usize {
    debug_assert!((-MAX_ACTION..=MAX_ACTION).contains(&action));
    (action + ACTION_INDEX_OFFSET) as usize
}

/// Action with the highest estimated value. Ties go to the lowest action.
pub fn greedy_action(values: &ActionValues) -> i32 {
    let mut best = 0;
    for (i, value) in values.iter().enumerate().skip(1) {
        if *value > values[best] {
            best = i;
        }
    }
    best as i32 - ACTION_INDEX_OFFSET
}

/// Picks a uniformly random action with probability `epsilon`, otherwise the
/// estimator's best action.
#[derive(Debug, Clone, Copy)]
pub struct EpsilonGreedy {
    epsilon: f64,
    explore: Bernoulli,
}

impl EpsilonGreedy {
    pub fn new(epsilon: f64) -> Result<Self, ExperienceError> {
        let explore = Bernoulli::new(epsilon).map_err(|_| ExperienceError::InvalidEpsilon(epsilon))?;
        Ok(Self { epsilon, explore })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn select<E>(&self, estimator: &E, observation: &Observation, rng: &mut impl Rng) -> i32
    where
        E: ActionValueEstimator + ?Sized,
    {
        if self.explore.sample(rng) {
            rng.gen_range(-MAX_ACTION..=MAX_ACTION)
        } else {
            greedy_action(&estimator.estimate(observation))
        }
    }
}

/// How the exploration rate evolves over a training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EpsilonSchedule {
    Constant { epsilon: f64 },
    /// Decays linearly from `start` to zero over `rollouts` rollouts.
    Linear { start: f64, rollouts: usize },
}

impl Default for EpsilonSchedule {
    fn default() -> Self {
        Self::Linear {
            start: 0.8,
            rollouts: 10_000,
        }
    }
}

impl EpsilonSchedule {
    /// Exploration rate for the zero-based rollout number `rollout`.
    pub fn epsilon_at(&self, rollout: usize) -> f64 {
        match *self {
            Self::Constant { epsilon } => epsilon,
            Self::Linear { rollouts: 0, .. } => 0.0,
            Self::Linear { start, rollouts } => {
                let progress = (rollout as f64 / rollouts as f64).min(1.0);
                start * (1.0 - progress)
            }
        }
    }

    pub fn policy_at(&self, rollout: usize) -> Result<EpsilonGreedy, ExperienceError> {
        EpsilonGreedy::new(self.epsilon_at(rollout))
    }

    pub fn validate(&self) -> Result<(), ExperienceError> {
        let start = match *self {
            Self::Constant { epsilon } => epsilon,
            Self::Linear { start, .. } => start,
        };
        EpsilonGreedy::new(start).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn obs() -> Observation {
        Observation([0.0; pacing::observation::OBSERVATION_LEN])
    }

    fn peaked_at(action: i32) -> impl Fn(&Observation) -> ActionValues {
        move |_| {
            let mut values = [0.0; NUM_ACTIONS];
            values[action_index(action)] = 1.0;
            values
        }
    }

    #[test]
    fn test_action_index_mapping_is_a_bijection() {
        assert_eq!(action_index(-10), 0);
        assert_eq!(action_index(0), 10);
        assert_eq!(action_index(10), 20);
        let mut values = [0.0; NUM_ACTIONS];
        for action in -MAX_ACTION..=MAX_ACTION {
            values.fill(0.0);
            values[action_index(action)] = 1.0;
            assert_eq!(greedy_action(&values), action);
        }
    }

    #[test]
    fn test_greedy_ties_pick_lowest_action() {
        assert_eq!(greedy_action(&[0.0; NUM_ACTIONS]), -MAX_ACTION);
    }

    #[test]
    fn test_zero_epsilon_is_greedy() {
        let policy = EpsilonGreedy::new(0.0).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(policy.select(&peaked_at(7), &obs(), &mut rng), 7);
        }
        assert_eq!(policy.select(&peaked_at(-3), &obs(), &mut rng), -3);
    }

    #[test]
    fn test_full_epsilon_explores_whole_range() {
        let policy = EpsilonGreedy::new(1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let mut seen = [false; NUM_ACTIONS];
        for _ in 0..2_000 {
            let action = policy.select(&peaked_at(0), &obs(), &mut rng);
            assert!((-MAX_ACTION..=MAX_ACTION).contains(&action));
            seen[action_index(action)] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_rejects_out_of_range_epsilon() {
        assert!(matches!(
            EpsilonGreedy::new(1.5),
            Err(ExperienceError::InvalidEpsilon(_))
        ));
        assert!(EpsilonGreedy::new(-0.1).is_err());
        assert!(EpsilonGreedy::new(f64::NAN).is_err());
    }

    #[test]
    fn test_linear_schedule_decays_to_zero() {
        let schedule = EpsilonSchedule::Linear {
            start: 0.8,
            rollouts: 100,
        };
        assert!((schedule.epsilon_at(0) - 0.8).abs() < 1e-12);
        assert!((schedule.epsilon_at(50) - 0.4).abs() < 1e-12);
        assert_eq!(schedule.epsilon_at(100), 0.0);
        assert_eq!(schedule.epsilon_at(250), 0.0);
        assert!(schedule.policy_at(10).is_ok());
    }
}
