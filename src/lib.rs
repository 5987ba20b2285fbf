//! # Freefall
//!
//! Simulation engine for the fall of a mass through a stratified
//! atmosphere with a time-delayed parachute deployment.
//!
//! The engine combines an ISA atmosphere table, Mach-dependent drag,
//! altitude-dependent gravity and an adaptive Dormand–Prince 5(4)
//! integrator with dense output. Integration runs until a root-finding
//! ground-impact event fires; a fixed-cadence sampler reconstructs
//! uniformly spaced trajectory samples from the integrator's internal
//! non-uniform steps.
//!
//! ```no_run
//! use freefall::{simulate_jump, JumpParameters};
//!
//! let params = JumpParameters {
//!     mass: 104.0,
//!     initial_height: 39_000.0,
//!     area: 0.5,
//!     area_parachute: 25.0,
//!     deploy_altitude: 1_500.0,
//!     transition_time: 4.0,
//! };
//! let result = simulate_jump(&params)?;
//! println!("landed after {:.1}s", result.time.last().unwrap());
//! # Ok::<(), freefall::SimulationError>(())
//! ```

pub use atmosphere::{standard_atmosphere, AtmosphereLayer, AtmosphereModel, AtmosphericProperties};
pub use drag::{drag_coefficient, gravity, DragTable};
pub use error::SimulationError;
pub use integrator::{DenseStep, Dopri5};
pub use motion::{EquationsOfMotion, JumpParameters, SampleChannels};
pub use sampler::TrajectorySampler;
pub use simulation::{
    simulate_jump, simulate_jump_with, SimulationResult, MAX_SIMULATION_TIME, OUTPUT_STEP,
};

mod atmosphere;
pub mod constants;
mod drag;
mod error;
mod integrator;
mod motion;
mod sampler;
mod simulation;
