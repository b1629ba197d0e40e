//! Coupled rider/course dynamics advanced by fixed-step Euler integration.

use tracing::warn;

use crate::course::Course;
use crate::errors::PacingError;
use crate::models::Rider;
use crate::observation::{
    Denormalizer, LOOK_AHEAD_OFFSETS, OBSERVATION_LEN, Observation, VELOCITY_SCALE_KMH,
};
use crate::units::{GRAVITY, kmh_to_mps};

/// Default integration step in seconds.
pub const DEFAULT_DT: f64 = 0.1;

/// Rough average air density in kg/m³.
pub const DEFAULT_AIR_DENSITY: f64 = 1.2;

/// What a single Euler step did to the rider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Change in distance over the step (negative when rolling backwards).
    pub distance_gained: f64,
    /// Anaerobic energy consumed over the step.
    pub energy_spent: f64,
    /// False when the integration produced a non-finite state.
    pub finite: bool,
}

/// The full physical system: one rider on one course.
///
/// The simulation exclusively owns its rider and course. Resetting restores the
/// rider's initial state in place, so one simulation serves many episodes.
pub struct Simulation {
    rider: Rider,
    course: Box<dyn Course>,
    time: f64,
    dt: f64,
    air_density: f64,
}

impl Simulation {
    /// Creates a simulation with the default time step and air density.
    pub fn new<C: Course + 'static>(rider: Rider, course: C) -> Self {
        Self::from_boxed(rider, Box::new(course))
    }

    pub fn from_boxed(rider: Rider, course: Box<dyn Course>) -> Self {
        Self {
            rider,
            course,
            time: 0.0,
            dt: DEFAULT_DT,
            air_density: DEFAULT_AIR_DENSITY,
        }
    }

    /// Overrides the time step and air density.
    pub fn with_settings(mut self, dt: f64, air_density: f64) -> Result<Self, PacingError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(PacingError::InvalidSimulation(format!(
                "time step must be positive, got {dt}"
            )));
        }
        if !(air_density.is_finite() && air_density >= 0.0) {
            return Err(PacingError::InvalidSimulation(format!(
                "air density must be non-negative, got {air_density}"
            )));
        }
        self.dt = dt;
        self.air_density = air_density;
        Ok(self)
    }

    pub fn rider(&self) -> &Rider {
        &self.rider
    }

    pub fn course(&self) -> &dyn Course {
        self.course.as_ref()
    }

    /// Simulated seconds since the last reset.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn air_density(&self) -> f64 {
        self.air_density
    }

    /// True once the rider has reached or passed the finish line.
    pub fn is_finished(&self) -> bool {
        self.rider.state.distance >= self.course.length()
    }

    /// Sets the propulsive force the rider applies during the next step.
    pub fn apply_force(&mut self, force: f64) {
        self.rider.state.force = force;
    }

    /// Force change corresponding to one unit of action: the largest change the
    /// rider's jerk allows over one step, split into ten increments.
    pub fn min_force_change(&self) -> f64 {
        self.rider.total_mass() * self.rider.params().max_jerk * self.dt / 10.0
    }

    /// Advances the system by one time step.
    ///
    /// Energy is only consumed while moving forward under positive force; riding
    /// backwards or coasting neither costs nor recovers energy. Non-finite results
    /// are logged and left in place.
    pub fn step(&mut self) -> StepReport {
        let dt = self.dt;
        let params = *self.rider.params();
        let mass = params.total_mass();

        self.rider.last_state = self.rider.state;
        let last = self.rider.last_state;
        let state = &mut self.rider.state;

        state.distance += last.velocity * dt;
        let air_drag = 0.5
            * params.drag_coef
            * params.frontal_area
            * self.air_density
            * last.velocity.powi(2);
        let gravity = mass * GRAVITY * self.course.slope(last.distance);
        state.velocity += (state.force - air_drag - gravity) / mass * dt;

        let distance_gained = state.distance - last.distance;
        let mut energy_spent = 0.0;
        if distance_gained > 0.0 && state.force > 0.0 {
            energy_spent = state.force * distance_gained;
            state.an_energy -= energy_spent;
        }

        self.time += dt;

        let finite = state.is_finite();
        if !finite {
            warn!(
                state = %state,
                last_state = %last,
                time = self.time,
                "Non-finite rider state after euler step"
            );
        }

        StepReport {
            distance_gained,
            energy_spent,
            finite,
        }
    }

    /// Encodes the current system state for an action-value estimator.
    ///
    /// See [`crate::observation`] for the layout.
    pub fn observe(&self) -> Observation {
        let rider = &self.rider;
        let state = &rider.state;
        let params = rider.params();
        let half_length = 0.5 * self.course.length();
        let half_budget = 0.5 * rider.energy_budget();

        let mut values = [0.0; OBSERVATION_LEN];
        values[0] = (state.distance - half_length) / half_length;
        values[1] = (state.velocity - params.avg_velocity) / kmh_to_mps(VELOCITY_SCALE_KMH);
        values[2] = (rider.last_state.force - rider.average_force()) / params.max_force;
        values[3] = (state.an_energy - half_budget) / half_budget;
        values[4] = self.course.slope(state.distance);
        for (i, offset) in LOOK_AHEAD_OFFSETS.iter().enumerate() {
            values[5 + i] = self.course.slope(state.distance + offset);
        }
        values[15] = params.max_jerk;
        values[16] = self.dt;

        Observation(values)
    }

    /// Restores the rider's initial state and rewinds the clock.
    pub fn reset(&mut self) {
        self.time = 0.0;
        self.rider.reset();
    }

    pub fn denormalizer(&self) -> Denormalizer {
        Denormalizer::for_simulation(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{FlatCourse, QuadraticHill};
    use crate::models::RiderState;
    use crate::profiles::RiderParams;

    fn flat_params() -> RiderParams {
        RiderParams {
            weight: 80.0,
            bike_weight: 0.0,
            frontal_area: 0.4,
            drag_coef: 0.7,
            ..Default::default()
        }
    }

    fn flat_sim(initial: RiderState) -> Simulation {
        let rider = Rider::new(initial, flat_params()).unwrap();
        Simulation::new(rider, FlatCourse::new(500.0).unwrap())
    }

    #[test]
    fn test_single_euler_step_on_flat() {
        let mut sim = flat_sim(RiderState::new(0.0, 7.0, 100.0, 50_000.0));
        let report = sim.step();

        let expected_velocity = 7.0 + (100.0 - 0.5 * 0.7 * 0.4 * 1.2 * 49.0) / 80.0 * 0.1;
        let state = sim.rider().state();
        assert!((state.velocity - expected_velocity).abs() < 1e-12);
        assert!((state.distance - 0.7).abs() < 1e-12);
        assert!((state.an_energy - (50_000.0 - 70.0)).abs() < 1e-9);
        assert!((sim.time() - 0.1).abs() < 1e-12);
        assert!(report.finite);
        assert!((report.energy_spent - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_gravity_uses_pre_step_distance() {
        let rider = Rider::new(RiderState::new(250.0, 5.0, 0.0, 10_000.0), RiderParams::default())
            .unwrap();
        let mut sim = Simulation::new(rider, QuadraticHill::new(500.0, 10.0).unwrap())
            .with_settings(0.1, 0.0)
            .unwrap();
        sim.step();

        // slope(250) = 0.05; with no drag or force only gravity acts.
        let expected = 5.0 - 9.8 * 0.05 * 0.1;
        assert!((sim.rider().state().velocity - expected).abs() < 1e-12);
    }

    #[test]
    fn test_energy_rule_over_sampled_transitions() {
        for velocity in [-3.0, 0.0, 2.0, 8.0] {
            for force in [-50.0, 0.0, 150.0] {
                let mut sim = flat_sim(RiderState::new(100.0, velocity, force, 20_000.0));
                let report = sim.step();
                let state = *sim.rider().state();
                let last = *sim.rider().last_state();
                let delta = state.distance - last.distance;

                if delta > 0.0 && force > 0.0 {
                    assert!((state.an_energy - (last.an_energy - force * delta)).abs() < 1e-9);
                } else {
                    assert_eq!(state.an_energy, last.an_energy);
                    assert_eq!(report.energy_spent, 0.0);
                }
            }
        }
    }

    #[test]
    fn test_last_state_is_copied_before_step() {
        let mut sim = flat_sim(RiderState::new(0.0, 7.0, 100.0, 50_000.0));
        sim.apply_force(120.0);
        sim.step();
        assert_eq!(*sim.rider().last_state(), RiderState::new(0.0, 7.0, 120.0, 50_000.0));
    }

    #[test]
    fn test_non_finite_state_is_not_clamped() {
        let mut sim = flat_sim(RiderState::new(0.0, 1e200, 100.0, 50_000.0));
        let report = sim.step();
        assert!(!report.finite);
        assert!(sim.rider().state().velocity.is_infinite());
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let initial = RiderState::new(0.0, 7.0, 100.0, 50_000.0);
        let mut sim = flat_sim(initial);
        for _ in 0..10 {
            sim.apply_force(250.0);
            sim.step();
        }
        sim.reset();
        assert_eq!(*sim.rider().state(), initial);
        assert_eq!(*sim.rider().last_state(), RiderState::new(0.0, 0.0, 100.0, 0.0));
        assert_eq!(sim.time(), 0.0);
    }

    #[test]
    fn test_observation_layout() {
        let rider =
            Rider::new(RiderState::new(0.0, 7.0, 100.0, 50_000.0), RiderParams::default()).unwrap();
        let sim = Simulation::new(rider, QuadraticHill::new(500.0, 11.0).unwrap());
        let obs = sim.observe();

        assert_eq!(obs.as_slice().len(), OBSERVATION_LEN);
        assert!((obs.distance() + 1.0).abs() < 1e-12);
        let expected_velocity = (7.0 - kmh_to_mps(25.0)) / kmh_to_mps(100.0);
        assert!((obs.velocity() - expected_velocity).abs() < 1e-12);
        assert_eq!(obs.last_force(), 0.0);
        assert!((obs.energy() - 1.0).abs() < 1e-12);
        assert_eq!(obs.slope(), 0.0);
        for (i, slope) in obs.look_ahead().iter().enumerate() {
            let expected = 11.0 * 10.0 * (i + 1) as f64 / 50_000.0;
            assert!((slope - expected).abs() < 1e-12);
        }
        assert_eq!(obs.max_jerk(), 1.0);
        assert_eq!(obs.dt(), 0.1);
    }

    #[test]
    fn test_denormalizer_inverts_observation() {
        let mut sim = flat_sim(RiderState::new(0.0, 7.0, 100.0, 50_000.0));
        sim.apply_force(180.0);
        sim.step();
        let obs = sim.observe();
        let de = sim.denormalizer();
        let state = *sim.rider().state();

        assert!((de.distance(&obs) - state.distance).abs() < 1e-9);
        assert!((de.velocity(&obs) - state.velocity).abs() < 1e-9);
        assert!((de.last_force(&obs) - 180.0).abs() < 1e-9);
        assert!((de.energy(&obs) - state.an_energy).abs() < 1e-6);
    }

    #[test]
    fn test_min_force_change() {
        let sim = flat_sim(RiderState::new(0.0, 7.0, 100.0, 50_000.0));
        assert!((sim.min_force_change() - 80.0 * 1.0 * 0.1 / 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_settings() {
        let sim = flat_sim(RiderState::new(0.0, 7.0, 100.0, 50_000.0));
        assert!(sim.with_settings(0.0, 1.2).is_err());
    }
}
