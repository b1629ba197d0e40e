//! Denormalized per-step trajectories for inspecting and plotting rollouts.

use std::fs;
use std::path::Path;

use pacing::observation::Denormalizer;
use serde::Serialize;

use crate::errors::ExperienceError;
use crate::replay::ExperienceReplay;

/// Physical quantities recovered from one transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrajectoryPoint {
    /// Distance at the start of the step, in meters.
    pub distance: f64,
    /// Velocity at the start of the step, in m/s.
    pub velocity: f64,
    /// Force applied during the step, in newtons.
    pub force: f64,
    /// Energy remaining at the start of the step, in joules.
    pub energy: f64,
    pub action: i32,
    pub reward: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trajectory {
    pub points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn from_replay(replay: &ExperienceReplay, denormalizer: &Denormalizer) -> Self {
        let points = replay
            .transitions()
            .iter()
            .map(|t| TrajectoryPoint {
                distance: denormalizer.distance(&t.start_observation),
                velocity: denormalizer.velocity(&t.start_observation),
                force: denormalizer.last_force(&t.result_observation),
                energy: denormalizer.energy(&t.start_observation),
                action: t.action,
                reward: t.reward,
            })
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ExperienceError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
