//! Rider and course dynamics for pacing simulations.
//!
//! This crate models a cyclist riding a one-dimensional course: the rider's
//! physical parameters and kinematic state, the course profile, a fixed-step
//! Euler integrator coupling the two, and the reward/termination policies used
//! to score each step for reinforcement learning.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use pacing::prelude::*;
//!
//! let rider = Rider::new(RiderState::new(0.0, 7.0, 100.0, 50_000.0), RiderParams::default())?;
//! let mut sim = Simulation::new(rider, QuadraticHill::new(500.0, 11.0)?);
//! sim.apply_force(120.0);
//! sim.step();
//! let obs = sim.observe();
//! ```

pub mod course;
pub mod errors;
pub mod models;
pub mod observation;
pub mod profiles;
pub mod rewards;
pub mod simulation;
pub mod terrain;
pub mod units;

pub use errors::PacingError;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::course::{
        Course, CourseConfig, FlatCourse, IdealCourse, PointwiseCourse, QuadraticHill,
    };
    pub use crate::errors::PacingError;
    pub use crate::models::{Rider, RiderState};
    pub use crate::observation::{Denormalizer, OBSERVATION_LEN, Observation};
    pub use crate::profiles::RiderParams;
    pub use crate::rewards::{Policy, RewardBundle, RewardPolicy, SevereMistake, StepReward};
    pub use crate::simulation::{Simulation, StepReport};
    pub use crate::terrain::TerrainParams;
}
