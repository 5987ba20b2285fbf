//! Adaptive Dormand–Prince 5(4) integrator with dense output and
//! root-finding event termination.
//!
//! The solver advances a 3-component state vector with an embedded
//! fifth/fourth-order Runge–Kutta pair, controls the step size from the
//! combined absolute/relative error estimate, and exposes each accepted
//! step as a continuous (interpolatable) solution. A scalar event
//! function is checked on every accepted step; a sign change is located
//! with Brent's method on the dense solution and truncates integration
//! at the root.

use log::debug;
use nalgebra::Vector3;

use crate::error::SimulationError;

// Dormand-Prince 5(4) nodes
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

// Stage coefficients
const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// Fifth-order solution weights (also the seventh stage row, FSAL)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Error-estimate weights (fifth minus embedded fourth order)
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

// Dense-output weights
const D1: f64 = -12715105075.0 / 11282082432.0;
const D3: f64 = 87487479700.0 / 32700410799.0;
const D4: f64 = -10690763975.0 / 1880347072.0;
const D5: f64 = 701980252875.0 / 199316789632.0;
const D6: f64 = -1453857185.0 / 822651844.0;
const D7: f64 = 69997945.0 / 29380423.0;

// Step-size controller
const SAFETY_FACTOR: f64 = 0.9;
const MIN_SCALE: f64 = 0.2;
const MAX_SCALE: f64 = 10.0;
const ERROR_EXPONENT: f64 = -0.2;

/// Absolute time tolerance for event root location (s).
const EVENT_TIME_TOLERANCE: f64 = 1e-9;
const EVENT_MAX_ITERATIONS: usize = 100;

/// Continuous solution over one accepted step.
///
/// The interpolation polynomial always spans the full accepted step;
/// `end_time` may fall short of the step end when an event truncated it.
#[derive(Debug, Clone)]
pub struct DenseStep {
    step_start: f64,
    step_size: f64,
    end_time: f64,
    cont: [Vector3<f64>; 5],
}

impl DenseStep {
    /// Start of the interval covered by this step.
    pub fn start_time(&self) -> f64 {
        self.step_start
    }

    /// End of the interval covered by this step (the event root when the
    /// step was truncated).
    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// Evaluate the continuous solution at `time` within the step.
    pub fn interpolate(&self, time: f64) -> Vector3<f64> {
        let theta = (time - self.step_start) / self.step_size;
        let theta1 = 1.0 - theta;
        self.cont[0]
            + theta
                * (self.cont[1] + theta1 * (self.cont[2] + theta * (self.cont[3] + theta1 * self.cont[4])))
    }
}

/// Adaptive-step Dormand–Prince 5(4) solver configuration.
#[derive(Debug, Clone)]
pub struct Dopri5 {
    /// Absolute error tolerance per component
    pub abs_tolerance: f64,
    /// Relative error tolerance per component
    pub rel_tolerance: f64,
    /// Smallest allowed step (s)
    pub min_step: f64,
    /// Largest allowed step (s)
    pub max_step: f64,
}

impl Default for Dopri5 {
    fn default() -> Self {
        Dopri5 {
            abs_tolerance: 1e-8,
            rel_tolerance: 1e-8,
            min_step: 1e-8,
            max_step: 1.0,
        }
    }
}

impl Dopri5 {
    /// Integrate `derivatives` forward from `(t0, y0)` until the scalar
    /// `event` function changes sign or `t_max` is reached.
    ///
    /// Each accepted step is passed to `handler` together with an
    /// is-last flag; the handler sees the truncated interval when an
    /// event root ends the run. Returns the event time and state.
    ///
    /// Reaching `t_max` without an event root is a failure
    /// ([`SimulationError::TimeExceeded`]), not a valid termination.
    pub fn integrate<F, G, H>(
        &self,
        mut derivatives: F,
        mut event: G,
        mut handler: H,
        t0: f64,
        y0: Vector3<f64>,
        t_max: f64,
    ) -> Result<(f64, Vector3<f64>), SimulationError>
    where
        F: FnMut(f64, &Vector3<f64>) -> Result<Vector3<f64>, SimulationError>,
        G: FnMut(f64, &Vector3<f64>) -> f64,
        H: FnMut(&DenseStep, bool),
    {
        let mut t = t0;
        let mut y = y0;
        let mut k1 = derivatives(t, &y)?;
        let mut g_prev = event(t, &y);
        let mut h = self.initial_step();

        let mut accepted = 0usize;
        let mut rejected = 0usize;

        while t < t_max {
            h = h.clamp(self.min_step, self.max_step).min(t_max - t);

            // Stages 2..6
            let k2 = derivatives(t + C2 * h, &(y + h * A21 * k1))?;
            let k3 = derivatives(t + C3 * h, &(y + h * (A31 * k1 + A32 * k2)))?;
            let k4 = derivatives(t + C4 * h, &(y + h * (A41 * k1 + A42 * k2 + A43 * k3)))?;
            let k5 = derivatives(
                t + C5 * h,
                &(y + h * (A51 * k1 + A52 * k2 + A53 * k3 + A54 * k4)),
            )?;
            let k6 = derivatives(
                t + h,
                &(y + h * (A61 * k1 + A62 * k2 + A63 * k3 + A64 * k4 + A65 * k5)),
            )?;

            // Fifth-order solution; its derivative is the FSAL stage.
            let y_new = y + h * (B1 * k1 + B3 * k3 + B4 * k4 + B5 * k5 + B6 * k6);
            let k7 = derivatives(t + h, &y_new)?;

            let err_vec = h * (E1 * k1 + E3 * k3 + E4 * k4 + E5 * k5 + E6 * k6 + E7 * k7);
            let error = self.error_norm(&y, &y_new, &err_vec);

            if error > 1.0 && h > self.min_step {
                rejected += 1;
                let scale = (SAFETY_FACTOR * error.powf(ERROR_EXPONENT)).clamp(MIN_SCALE, MAX_SCALE);
                h *= scale;
                continue;
            }

            accepted += 1;
            let mut step = self.dense_step(t, h, &y, &y_new, &k1, &k3, &k4, &k5, &k6, &k7);

            // Event check on the accepted step.
            let g_new = event(t + h, &y_new);
            if g_prev * g_new < 0.0 || g_new == 0.0 {
                let t_root = locate_event_root(&mut event, &step, t, t + h, g_prev, g_new);
                let y_root = step.interpolate(t_root);
                step.end_time = t_root;
                handler(&step, true);
                debug!(
                    "event root at t={t_root:.6}s after {accepted} accepted / {rejected} rejected steps"
                );
                return Ok((t_root, y_root));
            }
            handler(&step, false);

            t += h;
            y = y_new;
            k1 = k7;
            g_prev = g_new;

            let scale = (SAFETY_FACTOR * error.powf(ERROR_EXPONENT)).clamp(MIN_SCALE, MAX_SCALE);
            h *= scale;
        }

        debug!("time bound {t_max}s reached without an event root");
        Err(SimulationError::TimeExceeded { time: t_max })
    }

    fn initial_step(&self) -> f64 {
        1e-4_f64.clamp(self.min_step, self.max_step)
    }

    /// Scaled RMS error norm over the state components.
    fn error_norm(&self, y: &Vector3<f64>, y_new: &Vector3<f64>, err: &Vector3<f64>) -> f64 {
        let mut sum = 0.0;
        for i in 0..3 {
            let scale = self.abs_tolerance + self.rel_tolerance * y[i].abs().max(y_new[i].abs());
            let ratio = err[i] / scale;
            sum += ratio * ratio;
        }
        (sum / 3.0).sqrt()
    }

    #[allow(clippy::too_many_arguments)]
    fn dense_step(
        &self,
        t: f64,
        h: f64,
        y: &Vector3<f64>,
        y_new: &Vector3<f64>,
        k1: &Vector3<f64>,
        k3: &Vector3<f64>,
        k4: &Vector3<f64>,
        k5: &Vector3<f64>,
        k6: &Vector3<f64>,
        k7: &Vector3<f64>,
    ) -> DenseStep {
        let ydiff = y_new - y;
        let bspl = h * k1 - ydiff;
        DenseStep {
            step_start: t,
            step_size: h,
            end_time: t + h,
            cont: [
                *y,
                ydiff,
                bspl,
                ydiff - h * k7 - bspl,
                h * (D1 * k1 + D3 * k3 + D4 * k4 + D5 * k5 + D6 * k6 + D7 * k7),
            ],
        }
    }
}

/// Locate the event root inside an accepted step with Brent's method on
/// the dense solution. The caller guarantees the bracket `[a, b]` holds
/// a sign change; the best bracketing estimate is returned if the
/// iteration budget runs out.
fn locate_event_root<G>(
    event: &mut G,
    step: &DenseStep,
    mut a: f64,
    mut b: f64,
    mut fa: f64,
    mut fb: f64,
) -> f64
where
    G: FnMut(f64, &Vector3<f64>) -> f64,
{
    if fb == 0.0 {
        return b;
    }

    let mut eval = |t: f64| -> f64 { event(t, &step.interpolate(t)) };

    if fa.abs() < fb.abs() {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }

    let mut c = a;
    let mut fc = fa;
    let mut d = b - a;
    let mut e = d;

    for _ in 0..EVENT_MAX_ITERATIONS {
        if fa.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tolerance = 2.0 * f64::EPSILON * b.abs() + 0.5 * EVENT_TIME_TOLERANCE;
        let m = 0.5 * (c - b);

        if fb == 0.0 || m.abs() <= tolerance {
            return b;
        }

        if e.abs() >= tolerance && fc.abs() > fb.abs() {
            let s = fb / fc;
            let (mut p, mut q);

            if (a - c).abs() < f64::EPSILON {
                // Secant step
                p = 2.0 * m * s;
                q = 1.0 - s;
            } else {
                // Inverse quadratic interpolation
                q = fc / fa;
                let r = fb / fa;
                p = s * (2.0 * m * q * (q - r) - (b - a) * (r - 1.0));
                q = (q - 1.0) * (r - 1.0) * (s - 1.0);
            }

            if p > 0.0 {
                q = -q;
            } else {
                p = -p;
            }

            let prev_e = e;
            e = d;

            if 2.0 * p < 3.0 * m * q - (tolerance * q).abs() && p < (0.5 * prev_e * q).abs() {
                d = p / q;
            } else {
                d = m;
                e = d;
            }
        } else {
            d = m;
            e = d;
        }

        a = b;
        fa = fb;

        if d.abs() > tolerance {
            b += d;
        } else if m > 0.0 {
            b += tolerance;
        } else {
            b -= tolerance;
        }

        fb = eval(b);

        if fc * fb > 0.0 {
            c = a;
            fc = fa;
            e = b - a;
            d = e;
        }
    }

    b
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn no_event(_t: f64, _y: &Vector3<f64>) -> f64 {
        1.0
    }

    #[test]
    fn initial_step_is_clamped_to_configured_bounds() {
        let solver = Dopri5::default();
        assert_relative_eq!(solver.initial_step(), 1e-4, epsilon = 1e-18);

        let tight = Dopri5 {
            max_step: 1e-5,
            ..Dopri5::default()
        };
        assert_relative_eq!(tight.initial_step(), 1e-5, epsilon = 1e-18);

        let coarse = Dopri5 {
            min_step: 1e-2,
            ..Dopri5::default()
        };
        assert_relative_eq!(coarse.initial_step(), 1e-2, epsilon = 1e-18);
    }

    #[test]
    fn exponential_decay_matches_analytic_solution() {
        let solver = Dopri5::default();
        let mut last = (0.0, Vector3::zeros());

        // Drive to the time bound on purpose; the result is a failure
        // but the handler still observed every step.
        let result = solver.integrate(
            |_t, y| Ok(-*y),
            no_event,
            |step, _| last = (step.end_time(), step.interpolate(step.end_time())),
            0.0,
            Vector3::new(1.0, 2.0, -1.0),
            5.0,
        );
        assert!(matches!(result, Err(SimulationError::TimeExceeded { .. })));

        let (t, y) = last;
        assert_relative_eq!(t, 5.0, epsilon = 1e-12);
        let expected = (-5.0f64).exp();
        assert_relative_eq!(y[0], expected, epsilon = 1e-6);
        assert_relative_eq!(y[1], 2.0 * expected, epsilon = 1e-6);
        assert_relative_eq!(y[2], -expected, epsilon = 1e-6);
    }

    #[test]
    fn event_root_is_located_precisely() {
        // y0' = -2, starting at 3: the first component crosses zero at
        // exactly t = 1.5.
        let solver = Dopri5::default();
        let (t_root, y_root) = solver
            .integrate(
                |_t, _y| Ok(Vector3::new(-2.0, 0.0, 0.0)),
                |_t, y| y[0],
                |_step, _last| {},
                0.0,
                Vector3::new(3.0, 0.0, 0.0),
                100.0,
            )
            .unwrap();

        assert_relative_eq!(t_root, 1.5, epsilon = 1e-7);
        assert_relative_eq!(y_root[0], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn dense_output_is_accurate_inside_steps() {
        let solver = Dopri5::default();
        let mut max_error: f64 = 0.0;

        let _ = solver.integrate(
            |t, _y| Ok(Vector3::new(t.cos(), 0.0, 0.0)),
            no_event,
            |step, _| {
                // Probe the interpolant at interior points against the
                // analytic solution sin(t).
                let (a, b) = (step.start_time(), step.end_time());
                for i in 1..10 {
                    let t = a + (b - a) * (i as f64) / 10.0;
                    let y = step.interpolate(t);
                    max_error = max_error.max((y[0] - t.sin()).abs());
                }
            },
            0.0,
            Vector3::zeros(),
            6.0,
        );

        assert!(max_error < 1e-5, "dense output error {max_error}");
    }

    #[test]
    fn steps_are_contiguous() {
        let solver = Dopri5::default();
        let mut expected_start = 0.0;

        let _ = solver.integrate(
            |_t, y| Ok(Vector3::new(y[1], -y[0], 0.0)),
            no_event,
            |step, _| {
                assert_relative_eq!(step.start_time(), expected_start, epsilon = 1e-12);
                assert!(step.end_time() > step.start_time());
                expected_start = step.end_time();
            },
            0.0,
            Vector3::new(1.0, 0.0, 0.0),
            10.0,
        );

        assert_relative_eq!(expected_start, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn derivative_error_aborts_integration() {
        let solver = Dopri5::default();
        let result = solver.integrate(
            |t, _y| {
                if t > 0.5 {
                    Err(SimulationError::Derivative {
                        time: t,
                        altitude: 0.0,
                        velocity: 0.0,
                        deployment: 0.0,
                    })
                } else {
                    Ok(Vector3::new(1.0, 0.0, 0.0))
                }
            },
            no_event,
            |_step, _last| {},
            0.0,
            Vector3::zeros(),
            10.0,
        );

        assert!(matches!(result, Err(SimulationError::Derivative { .. })));
    }

    #[test]
    fn event_at_initial_boundary_is_not_triggered_spuriously() {
        // Event function strictly positive the whole way: must run to
        // the time bound instead of inventing a root.
        let solver = Dopri5::default();
        let result = solver.integrate(
            |_t, _y| Ok(Vector3::new(1.0, 0.0, 0.0)),
            |_t, y| y[0] + 1.0,
            |_step, _last| {},
            0.0,
            Vector3::zeros(),
            2.0,
        );
        assert!(matches!(
            result,
            Err(SimulationError::TimeExceeded { time }) if time == 2.0
        ));
    }
}
