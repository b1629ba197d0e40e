//! Episode buffers and training batches.

use pacing::observation::Observation;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::ExperienceError;
use crate::exploration::{ActionValueEstimator, action_index};

/// One simulation step: where it started, what was done, what it earned, where it ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub start_observation: Observation,
    /// Force change in units of the rider's minimum force change, in `-10..=10`.
    pub action: i32,
    pub reward: f64,
    pub result_observation: Observation,
}

/// Transitions of the most recent rollout, in order.
///
/// After a rollout the last transition is always the terminal one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperienceReplay {
    transitions: Vec<Transition>,
}

impl From<Vec<Transition>> for ExperienceReplay {
    fn from(transitions: Vec<Transition>) -> Self {
        Self { transitions }
    }
}

impl ExperienceReplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn last(&self) -> Option<&Transition> {
        self.transitions.last()
    }

    pub fn total_reward(&self) -> f64 {
        self.transitions.iter().map(|t| t.reward).sum()
    }

    pub(crate) fn clear(&mut self) {
        self.transitions.clear();
    }

    pub(crate) fn push(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    /// Draws `size` distinct transitions uniformly at random, guaranteeing the
    /// final transition is among them.
    ///
    /// If the final transition was not drawn, the last drawn one is replaced by
    /// it. Requires `1 <= size <= len()`; callers clamp.
    pub fn sample_batch_plus_last(
        &self,
        size: usize,
        rng: &mut impl Rng,
    ) -> Result<Batch, ExperienceError> {
        let available = self.transitions.len();
        if size == 0 || size > available {
            return Err(ExperienceError::InvalidBatchSize {
                requested: size,
                available,
            });
        }

        let last = available - 1;
        let mut indices = rand::seq::index::sample(rng, available, size).into_vec();
        if !indices.contains(&last) {
            indices.pop();
            indices.push(last);
        }

        Ok(indices.iter().map(|&i| &self.transitions[i]).collect())
    }
}

/// Columnar view of sampled transitions: index `i` of every column belongs to
/// the same transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Batch {
    pub start_observations: Vec<Observation>,
    pub actions: Vec<i32>,
    pub rewards: Vec<f64>,
    pub result_observations: Vec<Observation>,
}

impl<'a> FromIterator<&'a Transition> for Batch {
    fn from_iter<I: IntoIterator<Item = &'a Transition>>(iter: I) -> Self {
        let mut batch = Batch::default();
        for t in iter {
            batch.start_observations.push(t.start_observation);
            batch.actions.push(t.action);
            batch.rewards.push(t.reward);
            batch.result_observations.push(t.result_observation);
        }
        batch
    }
}

impl Batch {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Estimator output index of each action.
    pub fn action_indices(&self) -> Vec<usize> {
        self.actions.iter().map(|a| action_index(*a)).collect()
    }

    /// One-step Q-learning targets: `reward + discount * max(estimate(result))`.
    pub fn q_targets<E>(&self, target: &E, discount: f64) -> Vec<f64>
    where
        E: ActionValueEstimator + ?Sized,
    {
        self.rewards
            .iter()
            .zip(&self.result_observations)
            .map(|(reward, result)| {
                let best = target
                    .estimate(result)
                    .into_iter()
                    .fold(f64::NEG_INFINITY, f64::max);
                reward + discount * best
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exploration::{ActionValues, NUM_ACTIONS};
    use pacing::observation::OBSERVATION_LEN;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn transition(i: usize) -> Transition {
        Transition {
            start_observation: Observation([i as f64; OBSERVATION_LEN]),
            action: (i % 21) as i32 - 10,
            reward: i as f64 * 0.5,
            result_observation: Observation([i as f64 + 1.0; OBSERVATION_LEN]),
        }
    }

    fn replay_of(len: usize) -> ExperienceReplay {
        (0..len).map(transition).collect::<Vec<_>>().into()
    }

    #[test]
    fn test_sample_always_contains_last() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in 1..=40 {
            let replay = replay_of(len);
            let last = replay.last().unwrap().clone();
            for size in 1..=len {
                for _ in 0..5 {
                    let batch = replay.sample_batch_plus_last(size, &mut rng).unwrap();
                    assert_eq!(batch.len(), size);
                    assert!(batch.start_observations.contains(&last.start_observation));
                }
            }
        }
    }

    #[test]
    fn test_sample_has_no_duplicates() {
        let mut rng = StdRng::seed_from_u64(11);
        let replay = replay_of(50);
        for _ in 0..100 {
            let batch = replay.sample_batch_plus_last(30, &mut rng).unwrap();
            let mut seen: Vec<f64> = batch.start_observations.iter().map(|o| o.0[0]).collect();
            seen.sort_by(f64::total_cmp);
            seen.dedup();
            assert_eq!(seen.len(), 30);
        }
    }

    #[test]
    fn test_sample_columns_stay_aligned() {
        let mut rng = StdRng::seed_from_u64(3);
        let replay = replay_of(25);
        let batch = replay.sample_batch_plus_last(10, &mut rng).unwrap();
        for i in 0..batch.len() {
            let id = batch.start_observations[i].0[0] as usize;
            let original = &replay.transitions()[id];
            assert_eq!(batch.actions[i], original.action);
            assert_eq!(batch.rewards[i], original.reward);
            assert_eq!(batch.result_observations[i], original.result_observation);
        }
    }

    #[test]
    fn test_sample_rejects_bad_sizes() {
        let mut rng = StdRng::seed_from_u64(0);
        let replay = replay_of(5);
        assert!(matches!(
            replay.sample_batch_plus_last(6, &mut rng),
            Err(ExperienceError::InvalidBatchSize {
                requested: 6,
                available: 5
            })
        ));
        assert!(replay.sample_batch_plus_last(0, &mut rng).is_err());
        assert!(ExperienceReplay::new().sample_batch_plus_last(1, &mut rng).is_err());
    }

    #[test]
    fn test_q_targets() {
        let batch: Batch = [transition(2), transition(4)].iter().collect();
        let target = |obs: &Observation| -> ActionValues {
            let mut values = [0.0; NUM_ACTIONS];
            values[5] = obs.0[0] * 10.0;
            values
        };
        let targets = batch.q_targets(&target, 0.1);
        // rewards 1.0 and 2.0; result observations hold 3.0 and 5.0.
        assert!((targets[0] - (1.0 + 0.1 * 30.0)).abs() < 1e-12);
        assert!((targets[1] - (2.0 + 0.1 * 50.0)).abs() < 1e-12);
        assert_eq!(batch.action_indices(), vec![2, 4]);
    }
}
