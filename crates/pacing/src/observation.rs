//! The fixed-layout observation vector handed to action-value estimators.
//!
//! Layout (index: feature):
//! - 0: distance, centred and scaled by half the course length
//! - 1: velocity, centred on the rider's average velocity, scaled by 100 km/h
//! - 2: previous force, centred on the average force, scaled by max force
//! - 3: anaerobic energy, centred and scaled by half the energy budget
//! - 4: slope at the current distance
//! - 5..=14: slope 10 m, 20 m, ... 100 m ahead
//! - 15: rider max jerk
//! - 16: simulation time step
//!
//! Trained estimators depend on this exact layout.

use serde::{Deserialize, Serialize};

use crate::simulation::Simulation;
use crate::units::kmh_to_mps;

pub const OBSERVATION_LEN: usize = 17;

/// Distances ahead of the rider at which the slope is sampled, in meters.
pub const LOOK_AHEAD_OFFSETS: [f64; 10] = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0];

/// Reference speed used to scale the velocity feature, in km/h.
pub const VELOCITY_SCALE_KMH: f64 = 100.0;

pub const DISTANCE: usize = 0;
pub const VELOCITY: usize = 1;
pub const LAST_FORCE: usize = 2;
pub const ENERGY: usize = 3;
pub const SLOPE: usize = 4;
pub const LOOK_AHEAD: usize = 5;
pub const MAX_JERK: usize = 15;
pub const DT: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation(pub [f64; OBSERVATION_LEN]);

impl Observation {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn distance(&self) -> f64 {
        self.0[DISTANCE]
    }

    pub fn velocity(&self) -> f64 {
        self.0[VELOCITY]
    }

    pub fn last_force(&self) -> f64 {
        self.0[LAST_FORCE]
    }

    pub fn energy(&self) -> f64 {
        self.0[ENERGY]
    }

    pub fn slope(&self) -> f64 {
        self.0[SLOPE]
    }

    pub fn look_ahead(&self) -> &[f64] {
        &self.0[LOOK_AHEAD..LOOK_AHEAD + LOOK_AHEAD_OFFSETS.len()]
    }

    pub fn max_jerk(&self) -> f64 {
        self.0[MAX_JERK]
    }

    pub fn dt(&self) -> f64 {
        self.0[DT]
    }
}

/// Inverts the normalization of observation features for one rider/course pairing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Denormalizer {
    pub half_length: f64,
    pub avg_velocity: f64,
    pub average_force: f64,
    pub max_force: f64,
    pub half_budget: f64,
}

impl Denormalizer {
    pub fn for_simulation(sim: &Simulation) -> Self {
        let rider = sim.rider();
        Self {
            half_length: 0.5 * sim.course().length(),
            avg_velocity: rider.params().avg_velocity,
            average_force: rider.average_force(),
            max_force: rider.max_force(),
            half_budget: 0.5 * rider.energy_budget(),
        }
    }

    pub fn distance(&self, obs: &Observation) -> f64 {
        obs.distance() * self.half_length + self.half_length
    }

    pub fn velocity(&self, obs: &Observation) -> f64 {
        obs.velocity() * kmh_to_mps(VELOCITY_SCALE_KMH) + self.avg_velocity
    }

    /// Force applied during the step that produced `obs`.
    pub fn last_force(&self, obs: &Observation) -> f64 {
        obs.last_force() * self.max_force + self.average_force
    }

    pub fn energy(&self, obs: &Observation) -> f64 {
        obs.energy() * self.half_budget + self.half_budget
    }
}
