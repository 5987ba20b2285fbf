//! Equations of motion for a mass falling through the atmosphere with a
//! time-delayed parachute deployment.
//!
//! The state vector is `[altitude, velocity, deployment]` where
//! deployment is the parachute opening progress in `[0, 1]`.

use nalgebra::Vector3;

use crate::atmosphere::AtmosphereModel;
use crate::drag::{drag_coefficient, gravity};
use crate::error::SimulationError;

/// State-vector index of the altitude component (m).
pub const ALTITUDE: usize = 0;
/// State-vector index of the velocity component (m/s, positive up).
pub const VELOCITY: usize = 1;
/// State-vector index of the parachute deployment progress.
pub const DEPLOYMENT: usize = 2;

/// Physical parameters of a jump, in SI units.
#[derive(Debug, Clone, PartialEq)]
pub struct JumpParameters {
    /// Total falling mass (kg)
    pub mass: f64,
    /// Altitude at the start of the fall (m)
    pub initial_height: f64,
    /// Cross-sectional area before parachute deployment (m²)
    pub area: f64,
    /// Cross-sectional area with the parachute fully open (m²)
    pub area_parachute: f64,
    /// Altitude at which the parachute starts to open (m)
    pub deploy_altitude: f64,
    /// Time for the parachute to open fully (s)
    pub transition_time: f64,
}

impl JumpParameters {
    /// Reject non-finite or non-positive inputs before a run starts.
    /// `deploy_altitude` may be zero.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let positive = [
            ("mass", self.mass),
            ("initial_height", self.initial_height),
            ("area", self.area),
            ("area_parachute", self.area_parachute),
            ("transition_time", self.transition_time),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimulationError::InvalidParameter { name, value });
            }
        }
        if !self.deploy_altitude.is_finite() || self.deploy_altitude < 0.0 {
            return Err(SimulationError::InvalidParameter {
                name: "deploy_altitude",
                value: self.deploy_altitude,
            });
        }
        Ok(())
    }

    /// Initial state vector at t = 0.
    pub fn initial_state(&self) -> Vector3<f64> {
        Vector3::new(self.initial_height, 0.0, 0.0)
    }
}

/// Auxiliary channels recomputed from a stored state.
#[derive(Debug, Clone, Copy)]
pub struct SampleChannels {
    /// Net acceleration (m/s², negative down)
    pub acceleration: f64,
    /// Mach number
    pub mach_number: f64,
    /// Drag coefficient
    pub drag_coefficient: f64,
}

/// State-derivative function combining the atmosphere and drag models.
pub struct EquationsOfMotion<'a> {
    params: &'a JumpParameters,
    atmosphere: &'a AtmosphereModel,
}

impl<'a> EquationsOfMotion<'a> {
    pub fn new(params: &'a JumpParameters, atmosphere: &'a AtmosphereModel) -> Self {
        EquationsOfMotion { params, atmosphere }
    }

    /// Cross-sectional area at the given deployment progress.
    pub fn effective_area(&self, deployment: f64) -> f64 {
        self.params.area + (self.params.area_parachute - self.params.area) * deployment
    }

    /// Net acceleration, Mach number and drag coefficient at a state.
    pub fn channels(&self, state: &Vector3<f64>) -> SampleChannels {
        let (acceleration, mach_number, cd) = self.dynamics(state);
        SampleChannels {
            acceleration,
            mach_number,
            drag_coefficient: cd,
        }
    }

    /// Derivatives of `[altitude, velocity, deployment]` at `(t, state)`.
    ///
    /// Fails with [`SimulationError::Derivative`] when any derivative is
    /// non-finite; the integration driver turns that into a terminal
    /// error instead of letting NaN propagate through the solver.
    pub fn derivatives(
        &self,
        time: f64,
        state: &Vector3<f64>,
    ) -> Result<Vector3<f64>, SimulationError> {
        let altitude = state[ALTITUDE];
        let velocity = state[VELOCITY];
        let deployment = state[DEPLOYMENT];

        let (acceleration, _, _) = self.dynamics(state);

        // Deployment only advances below the trigger altitude and never
        // overshoots full open.
        let deployment_rate = if altitude <= self.params.deploy_altitude && deployment < 1.0 {
            1.0 / self.params.transition_time
        } else {
            0.0
        };

        let derivatives = Vector3::new(velocity, acceleration, deployment_rate);
        if derivatives.iter().any(|d| !d.is_finite()) {
            return Err(SimulationError::Derivative {
                time,
                altitude,
                velocity,
                deployment,
            });
        }
        Ok(derivatives)
    }

    /// Shared core of `derivatives` and `channels`: net acceleration,
    /// Mach number and drag coefficient from a raw state.
    fn dynamics(&self, state: &Vector3<f64>) -> (f64, f64, f64) {
        let altitude = state[ALTITUDE];
        let velocity = state[VELOCITY];
        let deployment = state[DEPLOYMENT];

        let atmosphere = self.atmosphere.properties(altitude);
        let mach_number = if atmosphere.speed_of_sound > 0.0 {
            velocity.abs() / atmosphere.speed_of_sound
        } else {
            0.0
        };
        let cd = drag_coefficient(mach_number);

        let drag_force = 0.5
            * cd
            * atmosphere.density
            * self.effective_area(deployment)
            * velocity
            * velocity.abs();
        let acceleration = -gravity(altitude) - drag_force / self.params.mass;

        (acceleration, mach_number, cd)
    }
}
