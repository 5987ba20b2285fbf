use thiserror::Error;

/// Errors surfaced by a simulation run.
///
/// None of these are recoverable: a failed run produces no usable
/// result and is not retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// An input parameter was rejected before the run started.
    #[error("invalid parameter `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// A derivative evaluation produced a non-finite value. Carries the
    /// offending state so the caller can see where the model broke down.
    #[error(
        "non-finite derivative at t={time:.6}s \
         (altitude={altitude:.3}m, velocity={velocity:.3}m/s, deployment={deployment:.4})"
    )]
    Derivative {
        time: f64,
        altitude: f64,
        velocity: f64,
        deployment: f64,
    },

    /// The upper time bound was reached without a ground-impact root.
    /// Signals an invalid physical configuration, not a valid landing.
    #[error("no ground impact before t={time}s")]
    TimeExceeded { time: f64 },

    /// The run finished without recording a single sample.
    #[error("simulation produced no samples")]
    EmptyResult,
}
