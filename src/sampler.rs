//! Fixed-cadence trajectory sampling from the integrator's continuous
//! solution.
//!
//! The sampler is independent of the adaptive step grid: it keeps a
//! running "next output time" and, for every accepted step, evaluates
//! the dense solution at each pending grid time inside the step. The
//! exact initial and terminal states are always recorded, even when
//! they fall off-grid.

use nalgebra::Vector3;

use crate::error::SimulationError;
use crate::integrator::DenseStep;
use crate::motion::{EquationsOfMotion, ALTITUDE, DEPLOYMENT, VELOCITY};
use crate::simulation::SimulationResult;

/// Records uniformly spaced trajectory samples during integration.
pub struct TrajectorySampler<'a> {
    equations: &'a EquationsOfMotion<'a>,
    cadence: f64,
    next_output: f64,
    result: SimulationResult,
}

impl<'a> TrajectorySampler<'a> {
    /// Create a sampler emitting at `cadence` seconds, with the first
    /// grid point at `t0`.
    pub fn new(equations: &'a EquationsOfMotion<'a>, cadence: f64, t0: f64) -> Self {
        TrajectorySampler {
            equations,
            cadence,
            next_output: t0,
            result: SimulationResult::empty(),
        }
    }

    /// Record a state exactly, off-grid. Used for the initial state.
    pub fn record_state(&mut self, time: f64, state: &Vector3<f64>) {
        self.record(time, state);
    }

    /// Consume one accepted integrator step, emitting every pending grid
    /// time it covers. The terminal state of the last step is recorded
    /// exactly.
    pub fn handle_step(&mut self, step: &DenseStep, is_last: bool) {
        let t_start = step.start_time();
        let t_end = step.end_time();
        let forward = t_end > t_start;
        let increment = if forward { self.cadence } else { -self.cadence };

        while (forward && self.next_output <= t_end) || (!forward && self.next_output >= t_end) {
            let state = step.interpolate(self.next_output);
            self.record(self.next_output, &state);
            self.next_output += increment;
        }

        if is_last {
            let state = step.interpolate(t_end);
            self.record(t_end, &state);
        }
    }

    /// Finalize the result. An empty sample set is an error, never a
    /// valid trajectory.
    pub fn finish(self) -> Result<SimulationResult, SimulationError> {
        let mut result = self.result;
        if result.is_empty() {
            return Err(SimulationError::EmptyResult);
        }

        result.average_time_step = if result.len() > 1 {
            let span = result.time[result.len() - 1] - result.time[0];
            span / (result.len() - 1) as f64
        } else {
            self.cadence
        };
        Ok(result)
    }

    fn record(&mut self, time: f64, state: &Vector3<f64>) {
        // Clamp excursions for reporting only; the integrator's stored
        // state is never touched.
        let reported = Vector3::new(
            state[ALTITUDE].max(0.0),
            state[VELOCITY],
            state[DEPLOYMENT].clamp(0.0, 1.0),
        );
        let channels = self.equations.channels(&reported);

        self.result.time.push(time);
        self.result.altitude.push(reported[ALTITUDE]);
        self.result.velocity.push(reported[VELOCITY]);
        self.result.acceleration.push(channels.acceleration);
        self.result.mach_number.push(channels.mach_number);
        self.result.drag_coefficient.push(channels.drag_coefficient);
        self.result.deployment_progress.push(reported[DEPLOYMENT]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atmosphere::standard_atmosphere;
    use crate::integrator::Dopri5;
    use crate::motion::JumpParameters;
    use approx::assert_relative_eq;

    fn reference_params() -> JumpParameters {
        JumpParameters {
            mass: 104.0,
            initial_height: 39_000.0,
            area: 0.5,
            area_parachute: 25.0,
            deploy_altitude: 1_500.0,
            transition_time: 4.0,
        }
    }

    #[test]
    fn empty_sampler_is_an_error() {
        let params = reference_params();
        let equations = EquationsOfMotion::new(&params, standard_atmosphere());
        let sampler = TrajectorySampler::new(&equations, 0.1, 0.0);
        assert_eq!(sampler.finish(), Err(SimulationError::EmptyResult));
    }

    #[test]
    fn single_sample_uses_nominal_cadence() {
        let params = reference_params();
        let equations = EquationsOfMotion::new(&params, standard_atmosphere());
        let mut sampler = TrajectorySampler::new(&equations, 0.1, 0.0);
        sampler.record_state(0.0, &params.initial_state());

        let result = sampler.finish().unwrap();
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result.average_time_step, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn grid_times_are_reconstructed_from_dense_steps() {
        // Integrate the jump for a short stretch and confirm the sampler
        // emits the 0.1s grid regardless of the adaptive step layout.
        let params = reference_params();
        let equations = EquationsOfMotion::new(&params, standard_atmosphere());
        let mut sampler = TrajectorySampler::new(&equations, 0.1, 0.0);
        let y0 = params.initial_state();
        sampler.record_state(0.0, &y0);

        let solver = Dopri5::default();
        let _ = solver.integrate(
            |t, y| equations.derivatives(t, y),
            |t, _y| 3.0 - t, // stop at t = 3s
            |step, is_last| sampler.handle_step(step, is_last),
            0.0,
            y0,
            1000.0,
        );

        let result = sampler.finish().unwrap();
        // t=0 appears twice (exact initial point plus the first grid
        // point), then every 0.1s, then the exact event time.
        assert_relative_eq!(result.time[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(result.time[1], 0.0, epsilon = 1e-12);
        for pair in result.time[1..result.len() - 1].windows(2) {
            assert_relative_eq!(pair[1] - pair[0], 0.1, epsilon = 1e-9);
        }
        let last = result.time[result.len() - 1];
        assert_relative_eq!(last, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn reported_altitude_is_clamped_non_negative() {
        let params = reference_params();
        let equations = EquationsOfMotion::new(&params, standard_atmosphere());
        let mut sampler = TrajectorySampler::new(&equations, 0.1, 0.0);

        sampler.record_state(0.0, &Vector3::new(-0.4, -7.0, 1.0));
        let result = sampler.finish().unwrap();
        assert_eq!(result.altitude[0], 0.0);
    }
}
