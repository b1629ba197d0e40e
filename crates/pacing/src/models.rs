//! Rider state and rider entity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::PacingError;
use crate::profiles::RiderParams;

/// Average propulsive force used to centre the force feature of observations, in newtons.
///
/// Estimators are trained against this centring, so it is a fixed constant rather
/// than something derived from the rider's drag at their flat-terrain speed.
pub const AVERAGE_FORCE: f64 = 100.0;

/// Instantaneous kinematic state of a rider.
///
/// None of the fields are bounded here; limits are enforced by the severe-mistake
/// policies in [`crate::rewards`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiderState {
    /// Progress along the x axis in meters (not arc length).
    pub distance: f64,
    /// Tangential velocity in m/s.
    pub velocity: f64,
    /// Tangential propulsive force in newtons. Negative means braking.
    pub force: f64,
    /// Remaining anaerobic energy in joules.
    pub an_energy: f64,
}

impl RiderState {
    pub const fn new(distance: f64, velocity: f64, force: f64, an_energy: f64) -> Self {
        Self {
            distance,
            velocity,
            force,
            an_energy,
        }
    }

    /// Returns true when every field is a finite number.
    pub fn is_finite(&self) -> bool {
        self.distance.is_finite()
            && self.velocity.is_finite()
            && self.force.is_finite()
            && self.an_energy.is_finite()
    }
}

impl fmt::Display for RiderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rider State: [distance: {}, velocity: {}, force: {}, an_energy: {}]",
            self.distance, self.velocity, self.force, self.an_energy
        )
    }
}

/// A rider: fixed physical parameters plus the current and previous state.
///
/// Only [`crate::simulation::Simulation`] mutates the states, through `step`,
/// `apply_force` and `reset`.
#[derive(Debug, Clone)]
pub struct Rider {
    params: RiderParams,
    initial_state: RiderState,
    energy_budget: f64,
    average_force: f64,
    pub(crate) state: RiderState,
    pub(crate) last_state: RiderState,
}

impl Rider {
    /// Creates a rider starting from `initial_state`.
    ///
    /// The energy budget is taken from the initial state's `an_energy`, which must be
    /// positive because observations are normalized by it.
    pub fn new(initial_state: RiderState, params: RiderParams) -> Result<Self, PacingError> {
        params.validate()?;
        if !initial_state.is_finite() {
            return Err(PacingError::InvalidRider(format!(
                "initial state must be finite: {initial_state}"
            )));
        }
        if initial_state.an_energy <= 0.0 {
            return Err(PacingError::InvalidRider(format!(
                "energy budget must be positive, got {}",
                initial_state.an_energy
            )));
        }

        Ok(Self {
            params,
            initial_state,
            energy_budget: initial_state.an_energy,
            average_force: AVERAGE_FORCE,
            state: initial_state,
            last_state: Self::primed_last_state(&initial_state),
        })
    }

    /// Zero state carrying the initial force, so the first observation of an
    /// episode reports the initial force as the "last" force.
    fn primed_last_state(initial_state: &RiderState) -> RiderState {
        RiderState {
            force: initial_state.force,
            ..RiderState::default()
        }
    }

    pub fn params(&self) -> &RiderParams {
        &self.params
    }

    pub fn state(&self) -> &RiderState {
        &self.state
    }

    pub fn last_state(&self) -> &RiderState {
        &self.last_state
    }

    pub fn initial_state(&self) -> &RiderState {
        &self.initial_state
    }

    /// Total anaerobic energy available over a ride, in joules.
    pub fn energy_budget(&self) -> f64 {
        self.energy_budget
    }

    pub fn average_force(&self) -> f64 {
        self.average_force
    }

    pub fn max_force(&self) -> f64 {
        self.params.max_force
    }

    pub fn total_mass(&self) -> f64 {
        self.params.total_mass()
    }

    pub(crate) fn reset(&mut self) {
        self.state = self.initial_state;
        self.last_state = Self::primed_last_state(&self.initial_state);
    }
}
