//! Rider physiology and equipment presets.

use serde::{Deserialize, Serialize};

use crate::errors::PacingError;
use crate::units::kmh_to_mps;

/// Static physical parameters of a rider and their bike.
///
/// Based on a typical trained amateur on a road bike:
/// - 87 kg rider on a 7 kg bike
/// - ~0.4 m² frontal area with a drag coefficient of 0.7
/// - ~25 km/h average speed over mixed terrain, ~27 km/h on the flat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiderParams {
    /// Rider body weight in kilograms.
    pub weight: f64,
    /// Bike weight in kilograms.
    pub bike_weight: f64,
    /// Combined frontal area of rider and bike in m².
    pub frontal_area: f64,
    /// Aerodynamic drag coefficient.
    pub drag_coef: f64,
    /// Maximum sustainable tangential force in newtons.
    pub max_force: f64,
    /// Maximum change in acceleration per second, in m/s³.
    pub max_jerk: f64,
    /// Rough average speed over the course in m/s.
    pub avg_velocity: f64,
    /// Rough average speed on flat terrain in m/s.
    pub avg_velocity_on_flat: f64,
}

impl Default for RiderParams {
    fn default() -> Self {
        Self {
            weight: 87.0,
            bike_weight: 7.0,
            frontal_area: 0.4,
            drag_coef: 0.7,
            max_force: 1000.0,
            max_jerk: 1.0,
            avg_velocity: kmh_to_mps(25.0),
            avg_velocity_on_flat: kmh_to_mps(27.0),
        }
    }
}

impl RiderParams {
    /// Creates an elite racer profile: lighter, more aerodynamic, stronger.
    pub fn elite() -> Self {
        Self {
            weight: 70.0,
            bike_weight: 6.8,
            frontal_area: 0.32,
            drag_coef: 0.63,
            max_force: 1400.0,
            max_jerk: 1.5,
            avg_velocity: kmh_to_mps(35.0),
            avg_velocity_on_flat: kmh_to_mps(40.0),
        }
    }

    /// Creates a recreational rider profile (~22 km/h on the flat, upright position).
    pub fn recreational() -> Self {
        Self {
            weight: 80.0,
            bike_weight: 11.0,
            frontal_area: 0.5,
            drag_coef: 0.9,
            max_force: 700.0,
            max_jerk: 0.8,
            avg_velocity: kmh_to_mps(19.0),
            avg_velocity_on_flat: kmh_to_mps(22.0),
        }
    }

    /// Combined mass of rider and bike in kilograms.
    pub fn total_mass(&self) -> f64 {
        self.weight + self.bike_weight
    }

    /// Checks that every parameter the integrator divides by or scales with is usable.
    pub fn validate(&self) -> Result<(), PacingError> {
        let positive = [
            ("weight", self.weight),
            ("frontal_area", self.frontal_area),
            ("drag_coef", self.drag_coef),
            ("max_force", self.max_force),
            ("max_jerk", self.max_jerk),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(PacingError::InvalidRider(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !(self.bike_weight.is_finite() && self.bike_weight >= 0.0) {
            return Err(PacingError::InvalidRider(format!(
                "bike_weight must be non-negative, got {}",
                self.bike_weight
            )));
        }
        if !self.avg_velocity.is_finite() || !self.avg_velocity_on_flat.is_finite() {
            return Err(PacingError::InvalidRider(
                "average velocities must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
