//! Reward shaping and severe-mistake termination policies.
//!
//! A [`RewardBundle`] scores one simulation step by summing every numeric
//! [`RewardPolicy`] and checking every [`SevereMistake`]. If any severe mistake
//! fires, the step is aborted: the rollout replaces the reward with the bundle's
//! `severe_mistake_penalty` and ends the episode.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::PacingError;
use crate::simulation::Simulation;
use crate::units::count_multiples;

/// Policies that contribute a numeric reward (or penalty) every step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RewardPolicy {
    /// `base_reward` for every multiple of `spacing` meters crossed during the step.
    Milestones { base_reward: f64, spacing: f64 },
    /// Quadratic penalty for force above max force or below zero.
    ForceBounds { scaling: f64 },
    /// Quadratic penalty for energy below zero.
    UnderZeroEnergy { scaling: f64 },
    /// Fixed bonus once past the finish line.
    Completion { reward: f64 },
    /// `expected_time - time` once past the finish line.
    FinalTime { expected_time: f64 },
}

impl RewardPolicy {
    pub fn reward(&self, sim: &Simulation) -> f64 {
        let rider = sim.rider();
        let state = rider.state();
        let past_finish = state.distance > sim.course().length();

        match *self {
            Self::Milestones {
                base_reward,
                spacing,
            } => {
                let passed = count_multiples(rider.last_state().distance, state.distance, spacing);
                if passed > 0 {
                    base_reward * passed as f64
                } else {
                    0.0
                }
            }
            Self::ForceBounds { scaling } => {
                let max_force = rider.max_force();
                if state.force > max_force {
                    -scaling * (state.force - max_force).powi(2)
                } else if state.force < 0.0 {
                    -scaling * state.force.powi(2)
                } else {
                    0.0
                }
            }
            Self::UnderZeroEnergy { scaling } => {
                if state.an_energy < 0.0 {
                    -scaling * state.an_energy.powi(2)
                } else {
                    0.0
                }
            }
            Self::Completion { reward } => {
                if past_finish {
                    reward
                } else {
                    0.0
                }
            }
            Self::FinalTime { expected_time } => {
                if past_finish {
                    expected_time - sim.time()
                } else {
                    0.0
                }
            }
        }
    }

    fn validate(&self) -> Result<(), PacingError> {
        match *self {
            Self::Milestones { spacing, .. } if !(spacing.is_finite() && spacing > 0.0) => Err(
                PacingError::InvalidPolicy(format!("milestone spacing must be positive, got {spacing}")),
            ),
            _ => Ok(()),
        }
    }
}

/// Conditions that end an episode immediately with the severe-mistake penalty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SevereMistake {
    /// Energy below zero or force above the rider's max force.
    RiderAbilities,
    /// Simulated time beyond `cutoff_time` seconds.
    CutoffTime { cutoff_time: f64 },
    UnderMinForce { min_force: f64 },
    UnderMinEnergy { min_energy: f64 },
    /// Distance decreased since the last state.
    GoingBackwards,
}

impl SevereMistake {
    pub fn violated(&self, sim: &Simulation) -> bool {
        let rider = sim.rider();
        let state = rider.state();

        match *self {
            Self::RiderAbilities => state.an_energy < 0.0 || state.force > rider.max_force(),
            Self::CutoffTime { cutoff_time } => sim.time() > cutoff_time,
            Self::UnderMinForce { min_force } => state.force < min_force,
            Self::UnderMinEnergy { min_energy } => state.an_energy < min_energy,
            Self::GoingBackwards => state.distance < rider.last_state().distance,
        }
    }

    /// Short stable name, used as a counter key and in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RiderAbilities => "rider_abilities",
            Self::CutoffTime { .. } => "cutoff_time",
            Self::UnderMinForce { .. } => "under_min_force",
            Self::UnderMinEnergy { .. } => "under_min_energy",
            Self::GoingBackwards => "going_backwards",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    Reward(RewardPolicy),
    Severe(SevereMistake),
}

impl From<RewardPolicy> for Policy {
    fn from(policy: RewardPolicy) -> Self {
        Self::Reward(policy)
    }
}

impl From<SevereMistake> for Policy {
    fn from(mistake: SevereMistake) -> Self {
        Self::Severe(mistake)
    }
}

/// Outcome of scoring one step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepReward {
    /// No severe mistake; the summed reward of all numeric policies.
    Continue(f64),
    /// At least one severe mistake fired. `discarded` is the numeric sum that the
    /// penalty replaces.
    Abort {
        penalty: f64,
        mistakes: Vec<SevereMistake>,
        discarded: f64,
    },
}

impl StepReward {
    /// The reward to record for the step.
    pub fn value(&self) -> f64 {
        match self {
            Self::Continue(reward) => *reward,
            Self::Abort { penalty, .. } => *penalty,
        }
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Abort { .. })
    }
}

/// An ordered collection of policies that together define how a step is rewarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardBundle {
    pub policies: Vec<Policy>,
    pub severe_mistake_penalty: f64,
}

impl Default for RewardBundle {
    /// The bundle used for training on the default quadratic hill.
    fn default() -> Self {
        Self {
            policies: vec![
                RewardPolicy::Milestones {
                    base_reward: 3.0,
                    spacing: 10.0,
                }
                .into(),
                RewardPolicy::Completion { reward: 0.0 }.into(),
                SevereMistake::UnderMinForce { min_force: -100.0 }.into(),
                SevereMistake::CutoffTime { cutoff_time: 500.0 }.into(),
                RewardPolicy::ForceBounds { scaling: 50.0 }.into(),
                RewardPolicy::UnderZeroEnergy { scaling: 2.0 }.into(),
                RewardPolicy::FinalTime {
                    expected_time: 200.0,
                }
                .into(),
                SevereMistake::UnderMinEnergy {
                    min_energy: -2000.0,
                }
                .into(),
                SevereMistake::GoingBackwards.into(),
            ],
            severe_mistake_penalty: -100.0,
        }
    }
}

impl RewardBundle {
    pub fn new(policies: Vec<Policy>, severe_mistake_penalty: f64) -> Result<Self, PacingError> {
        let bundle = Self {
            policies,
            severe_mistake_penalty,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn validate(&self) -> Result<(), PacingError> {
        if !self.severe_mistake_penalty.is_finite() {
            return Err(PacingError::InvalidPolicy(
                "severe mistake penalty must be finite".to_string(),
            ));
        }
        for policy in &self.policies {
            if let Policy::Reward(reward) = policy {
                reward.validate()?;
            }
        }
        Ok(())
    }

    /// Scores the step that just happened in `sim`.
    ///
    /// Every policy is evaluated; numeric rewards are summed even when a severe
    /// mistake has already fired.
    pub fn score(&self, sim: &Simulation) -> StepReward {
        let mut total = 0.0;
        let mut mistakes = Vec::new();

        for policy in &self.policies {
            match policy {
                Policy::Reward(reward) => total += reward.reward(sim),
                Policy::Severe(mistake) => {
                    if mistake.violated(sim) {
                        mistakes.push(*mistake);
                    }
                }
            }
        }

        if mistakes.is_empty() {
            return StepReward::Continue(total);
        }

        debug!(
            mistakes = ?mistakes.iter().map(SevereMistake::name).collect::<Vec<_>>(),
            time = sim.time(),
            state = %sim.rider().state(),
            "Severe mistake, aborting episode"
        );
        StepReward::Abort {
            penalty: self.severe_mistake_penalty,
            mistakes,
            discarded: total,
        }
    }

    /// Extends every cutoff-time policy by `seconds`.
    pub fn extend_cutoff(&mut self, seconds: f64) {
        for policy in &mut self.policies {
            if let Policy::Severe(SevereMistake::CutoffTime { cutoff_time }) = policy {
                *cutoff_time += seconds;
            }
        }
    }

    /// The tightest cutoff time in the bundle, if any.
    pub fn cutoff_time(&self) -> Option<f64> {
        self.policies
            .iter()
            .filter_map(|p| match p {
                Policy::Severe(SevereMistake::CutoffTime { cutoff_time }) => Some(*cutoff_time),
                _ => None,
            })
            .reduce(f64::min)
    }
}
