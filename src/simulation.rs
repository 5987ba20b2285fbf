//! Simulation driver: wires the equations of motion, the adaptive
//! integrator, the ground-impact event and the trajectory sampler into
//! a single synchronous run.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::atmosphere::standard_atmosphere;
use crate::error::SimulationError;
use crate::integrator::Dopri5;
use crate::motion::{EquationsOfMotion, JumpParameters, ALTITUDE, VELOCITY};
use crate::sampler::TrajectorySampler;

/// Output cadence of the trajectory sampler (s).
pub const OUTPUT_STEP: f64 = 0.1;

/// Upper integration time bound (s). Reaching it without a ground
/// impact is a failure, not a simulation horizon.
pub const MAX_SIMULATION_TIME: f64 = 1000.0;

/// Completed trajectory of one jump, as parallel per-sample channels.
///
/// Samples are time-ordered and, aside from the exact initial/terminal
/// points, uniformly spaced at the output cadence. The result is owned
/// by the caller; the engine keeps no reference to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Sample times (s)
    pub time: Vec<f64>,
    /// Altitude above ground (m), clamped non-negative
    pub altitude: Vec<f64>,
    /// Vertical velocity (m/s, negative down)
    pub velocity: Vec<f64>,
    /// Net acceleration (m/s²)
    pub acceleration: Vec<f64>,
    /// Mach number
    pub mach_number: Vec<f64>,
    /// Drag coefficient
    pub drag_coefficient: Vec<f64>,
    /// Parachute deployment progress in [0, 1]
    pub deployment_progress: Vec<f64>,
    /// Mean spacing between samples (s); the nominal cadence when fewer
    /// than two samples exist
    pub average_time_step: f64,
}

impl SimulationResult {
    pub(crate) fn empty() -> Self {
        SimulationResult::default()
    }

    /// Number of recorded samples.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Simulate a jump from `initial_height` down to ground impact.
///
/// Runs synchronously and returns the complete trajectory as one unit;
/// there is no partial delivery and no cancellation. The atmosphere
/// table is shared immutable state, so concurrent calls from separate
/// threads are safe.
pub fn simulate_jump(params: &JumpParameters) -> Result<SimulationResult, SimulationError> {
    params.validate()?;

    debug!(
        "simulating jump: mass={}kg, initial_height={}m, area={}m², \
         area_parachute={}m², deploy_altitude={}m, transition_time={}s",
        params.mass,
        params.initial_height,
        params.area,
        params.area_parachute,
        params.deploy_altitude,
        params.transition_time
    );

    let equations = EquationsOfMotion::new(params, standard_atmosphere());
    let y0 = params.initial_state();

    let mut sampler = TrajectorySampler::new(&equations, OUTPUT_STEP, 0.0);
    sampler.record_state(0.0, &y0);

    let solver = Dopri5::default();
    let outcome = solver.integrate(
        |t, y| equations.derivatives(t, y),
        |_t, y| y[ALTITUDE],
        |step, is_last| sampler.handle_step(step, is_last),
        0.0,
        y0,
        MAX_SIMULATION_TIME,
    );

    let (landing_time, landing_state) = match outcome {
        Ok(root) => root,
        Err(err) => {
            warn!("simulation failed: {err}");
            return Err(err);
        }
    };

    debug!(
        "landed at t={:.3}s with velocity {:.2}m/s",
        landing_time, landing_state[VELOCITY]
    );

    sampler.finish()
}

/// Convenience wrapper taking the six physical inputs directly
/// (SI units: kg, m, m², m², m, s).
pub fn simulate_jump_with(
    mass: f64,
    initial_height: f64,
    area: f64,
    area_parachute: f64,
    deploy_altitude: f64,
    transition_time: f64,
) -> Result<SimulationResult, SimulationError> {
    simulate_jump(&JumpParameters {
        mass,
        initial_height,
        area,
        area_parachute,
        deploy_altitude,
        transition_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameters_are_rejected_before_the_run() {
        let result = simulate_jump_with(-104.0, 39_000.0, 0.5, 25.0, 1_500.0, 4.0);
        assert!(matches!(
            result,
            Err(SimulationError::InvalidParameter { name: "mass", .. })
        ));

        let result = simulate_jump_with(104.0, 39_000.0, 0.5, f64::INFINITY, 1_500.0, 4.0);
        assert!(matches!(
            result,
            Err(SimulationError::InvalidParameter {
                name: "area_parachute",
                ..
            })
        ));
    }

    #[test]
    fn empty_results_compare_equal() {
        assert_eq!(SimulationResult::empty(), SimulationResult::default());
        let mut result = SimulationResult::empty();
        result.time.push(0.0);
        assert_ne!(result, SimulationResult::empty());
    }

    #[test]
    fn low_jump_lands_quickly() {
        // From 100m with an open-area canopy trigger at 80m the fall
        // should settle onto the canopy's terminal velocity and land.
        let result = simulate_jump_with(80.0, 100.0, 0.5, 25.0, 80.0, 2.0).unwrap();

        let last = result.len() - 1;
        assert!(result.altitude[last] < 1.0);
        assert!(result.velocity[last] < 0.0);
        // Terminal velocity under the canopy is a few m/s.
        assert!(result.velocity[last].abs() < 15.0);
    }
}
