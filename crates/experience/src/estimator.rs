//! A linear action-value estimator loadable from exported weights.

use std::fs;
use std::path::Path;

use pacing::observation::{OBSERVATION_LEN, Observation};
use serde::{Deserialize, Serialize};

use crate::errors::ExperienceError;
use crate::exploration::{ActionValueEstimator, ActionValues, MAX_ACTION, NUM_ACTIONS, action_index};

/// `values = weights · observation + bias`, one row per action.
///
/// Lets rollouts run against weights produced by an external trainer without
/// linking a neural network runtime. Row `i` holds action
/// `i - ACTION_INDEX_OFFSET` (offset 10). Trainers that index actions as
/// `action + 11` write rows one action off; load those with
/// [`LinearEstimator::with_index_offset`]`(11)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearEstimator {
    pub weights: [[f64; OBSERVATION_LEN]; NUM_ACTIONS],
    pub bias: ActionValues,
}

impl Default for LinearEstimator {
    fn default() -> Self {
        Self::zeros()
    }
}

impl LinearEstimator {
    pub fn zeros() -> Self {
        Self {
            weights: [[0.0; OBSERVATION_LEN]; NUM_ACTIONS],
            bias: [0.0; NUM_ACTIONS],
        }
    }

    /// An estimator that always prefers `action`.
    pub fn favoring(action: i32) -> Self {
        let mut estimator = Self::zeros();
        estimator.bias[action_index(action)] = 1.0;
        estimator
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ExperienceError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Re-maps rows written with `row = action + offset` onto this crate's layout.
    ///
    /// Actions with no source row get a bias of negative infinity so greedy
    /// selection never picks them.
    pub fn with_index_offset(self, offset: i32) -> Self {
        let mut remapped = Self::zeros();
        for action in -MAX_ACTION..=MAX_ACTION {
            let target = action_index(action);
            let source = action + offset;
            if (0..NUM_ACTIONS as i32).contains(&source) {
                remapped.weights[target] = self.weights[source as usize];
                remapped.bias[target] = self.bias[source as usize];
            } else {
                remapped.bias[target] = f64::NEG_INFINITY;
            }
        }
        remapped
    }
}

impl ActionValueEstimator for LinearEstimator {
    fn estimate(&self, observation: &Observation) -> ActionValues {
        let mut values = self.bias;
        for (value, row) in values.iter_mut().zip(self.weights.iter()) {
            *value += row
                .iter()
                .zip(observation.as_slice())
                .map(|(w, x)| w * x)
                .sum::<f64>();
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exploration::greedy_action;

    #[test]
    fn test_favoring_selects_action() {
        let estimator = LinearEstimator::favoring(3);
        let obs = Observation([0.5; OBSERVATION_LEN]);
        assert_eq!(greedy_action(&estimator.estimate(&obs)), 3);
    }

    #[test]
    fn test_linear_combination() {
        let mut estimator = LinearEstimator::zeros();
        estimator.weights[0][0] = 2.0;
        estimator.weights[0][16] = -1.0;
        estimator.bias[0] = 0.5;

        let mut values = [0.0; OBSERVATION_LEN];
        values[0] = 3.0;
        values[16] = 0.1;
        let out = estimator.estimate(&Observation(values));
        assert!((out[0] - (6.0 - 0.1 + 0.5)).abs() < 1e-12);
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn test_json_round_trip() {
        let estimator = LinearEstimator::favoring(-2);
        let json = serde_json::to_string(&estimator).unwrap();
        let parsed: LinearEstimator = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, estimator);
    }

    #[test]
    fn test_offset_eleven_rows_are_realigned() {
        // Written with row = action + 11: preferring action 3 puts the bias in row 14.
        let mut exported = LinearEstimator::zeros();
        exported.bias[14] = 1.0;
        exported.weights[14][0] = 0.25;

        let estimator = exported.with_index_offset(11);
        let obs = Observation([0.5; OBSERVATION_LEN]);
        let values = estimator.estimate(&obs);
        assert_eq!(greedy_action(&values), 3);
        assert_eq!(estimator.weights[action_index(3)][0], 0.25);
        assert_eq!(values[action_index(MAX_ACTION)], f64::NEG_INFINITY);
    }

    #[test]
    fn test_native_offset_is_identity() {
        let estimator = LinearEstimator::favoring(-4);
        assert_eq!(estimator.clone().with_index_offset(10), estimator);
    }
}
