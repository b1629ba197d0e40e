//! Episode rollouts: drive the simulation step by step and record transitions.
//!
//! A rollout resets the simulation, then repeatedly observes, picks an action,
//! turns it into a force, steps, and scores the step until the rider crosses the
//! finish line (finished) or a severe mistake ends the episode (aborted). The
//! loop only checks the finish line before each step, so the final step may carry
//! the rider slightly past it.

use std::collections::BTreeMap;

use pacing::models::RiderState;
use pacing::rewards::{RewardBundle, SevereMistake, StepReward};
use pacing::simulation::Simulation;
use rand::Rng;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::exploration::{ActionValueEstimator, EpsilonGreedy};
use crate::replay::{ExperienceReplay, Transition};

/// How a rollout ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RolloutOutcome {
    /// The rider reached the finish line.
    Finished,
    /// A severe mistake ended the episode; the last transition carries the penalty.
    Aborted { mistakes: Vec<SevereMistake> },
    /// The optional step limit was reached first.
    Truncated,
}

#[derive(Debug, Clone, Serialize)]
pub struct RolloutSummary {
    pub id: Uuid,
    pub outcome: RolloutOutcome,
    pub steps: usize,
    pub total_reward: f64,
    /// Simulated seconds at the end of the episode.
    pub elapsed_time: f64,
    pub final_state: RiderState,
    pub epsilon: f64,
    /// False if any step produced a non-finite rider state.
    pub finite: bool,
}

/// One episode of a rider on a course, scored by a reward bundle.
pub struct Rollout<'a, E: ?Sized> {
    simulation: &'a mut Simulation,
    rewards: &'a RewardBundle,
    estimator: &'a E,
    step_limit: Option<usize>,
}

impl<'a, E> Rollout<'a, E>
where
    E: ActionValueEstimator + ?Sized,
{
    pub fn new(simulation: &'a mut Simulation, rewards: &'a RewardBundle, estimator: &'a E) -> Self {
        Self {
            simulation,
            rewards,
            estimator,
            step_limit: None,
        }
    }

    /// Stops the episode after `limit` transitions if it has not ended by then.
    pub fn with_step_limit(mut self, limit: Option<usize>) -> Self {
        self.step_limit = limit;
        self
    }

    /// Runs one episode, replacing the contents of `replay` with its transitions.
    ///
    /// The first action is always 0 so the first step keeps the initial force.
    pub fn run(
        &mut self,
        replay: &mut ExperienceReplay,
        policy: &EpsilonGreedy,
        rng: &mut impl Rng,
    ) -> RolloutSummary {
        let sim = &mut *self.simulation;
        sim.reset();
        replay.clear();

        let length = sim.course().length();
        let min_force_change = sim.min_force_change();
        let denormalizer = sim.denormalizer();
        let mut outcome = RolloutOutcome::Finished;
        let mut finite = true;

        while sim.rider().state().distance < length {
            if self.step_limit.is_some_and(|limit| replay.len() >= limit) {
                outcome = RolloutOutcome::Truncated;
                break;
            }

            let start_observation = sim.observe();
            let action = if replay.is_empty() {
                0
            } else {
                policy.select(self.estimator, &start_observation, rng)
            };

            let last_force = denormalizer.last_force(&start_observation);
            sim.apply_force(last_force + min_force_change * action as f64);
            finite &= sim.step().finite;

            let result_observation = sim.observe();
            let scored = self.rewards.score(sim);

            replay.push(Transition {
                start_observation,
                action,
                reward: scored.value(),
                result_observation,
            });

            if let StepReward::Abort { mistakes, .. } = scored {
                outcome = RolloutOutcome::Aborted { mistakes };
                break;
            }
        }

        let summary = RolloutSummary {
            id: Uuid::new_v4(),
            outcome,
            steps: replay.len(),
            total_reward: replay.total_reward(),
            elapsed_time: sim.time(),
            final_state: *sim.rider().state(),
            epsilon: policy.epsilon(),
            finite,
        };
        debug!(
            id = %summary.id,
            outcome = ?summary.outcome,
            steps = summary.steps,
            total_reward = summary.total_reward,
            "Rollout complete"
        );
        summary
    }
}

/// Running totals over many rollouts, including how often each severe mistake fired.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RolloutStats {
    pub rollouts: usize,
    pub finished: usize,
    pub aborted: usize,
    pub truncated: usize,
    pub total_steps: usize,
    pub violations: BTreeMap<String, usize>,
    /// Rollouts that ended with a non-finite rider state, whatever their outcome.
    pub non_finite: usize,
    /// Fastest finite finish.
    pub best_finish_time: Option<f64>,
}

impl RolloutStats {
    pub fn record(&mut self, summary: &RolloutSummary) {
        self.rollouts += 1;
        self.total_steps += summary.steps;
        if !summary.finite {
            self.non_finite += 1;
        }
        match &summary.outcome {
            RolloutOutcome::Finished => {
                self.finished += 1;
                if !summary.finite {
                    return;
                }
                let best = self.best_finish_time.get_or_insert(summary.elapsed_time);
                *best = best.min(summary.elapsed_time);
            }
            RolloutOutcome::Aborted { mistakes } => {
                self.aborted += 1;
                for mistake in mistakes {
                    *self.violations.entry(mistake.name().to_string()).or_default() += 1;
                }
            }
            RolloutOutcome::Truncated => self.truncated += 1,
        }
    }

    pub fn merge(&mut self, other: &RolloutStats) {
        self.rollouts += other.rollouts;
        self.finished += other.finished;
        self.aborted += other.aborted;
        self.truncated += other.truncated;
        self.total_steps += other.total_steps;
        self.non_finite += other.non_finite;
        for (name, count) in &other.violations {
            *self.violations.entry(name.clone()).or_default() += count;
        }
        self.best_finish_time = match (self.best_finish_time, other.best_finish_time) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }
}
