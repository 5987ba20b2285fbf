//! Gravity and drag-coefficient models.
//!
//! Gravity follows an inverse-square falloff from standard surface
//! gravity. The drag coefficient is a function of Mach number, linearly
//! interpolated over an ordered table of control points and clamped to
//! the first/last entries outside the table range.

use once_cell::sync::Lazy;

use crate::constants::{EARTH_RADIUS, MIN_DIVISION_THRESHOLD, STANDARD_GRAVITY};

/// Gravitational acceleration at `altitude` meters above sea level (m/s²).
pub fn gravity(altitude: f64) -> f64 {
    let ratio = EARTH_RADIUS / (EARTH_RADIUS + altitude);
    STANDARD_GRAVITY * ratio * ratio
}

/// Ordered `(mach, cd)` control points for drag interpolation.
#[derive(Debug, Clone)]
pub struct DragTable {
    points: Vec<(f64, f64)>,
}

impl DragTable {
    /// Build a table from control points, sorting them by Mach number.
    pub fn new(mut points: Vec<(f64, f64)>) -> Self {
        points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        DragTable { points }
    }

    /// Interpolate the drag coefficient at `mach`.
    ///
    /// Below the first breakpoint returns the first entry's cd, above
    /// the last returns the last entry's cd; in between the table is
    /// piecewise linear.
    pub fn interpolate(&self, mach: f64) -> f64 {
        let n = self.points.len();
        if n == 0 {
            return 0.0;
        }
        if mach <= self.points[0].0 {
            return self.points[0].1;
        }
        if mach >= self.points[n - 1].0 {
            return self.points[n - 1].1;
        }

        let idx = self.points.partition_point(|(m, _)| *m <= mach);
        let (mach0, cd0) = self.points[idx - 1];
        let (mach1, cd1) = self.points[idx];

        let span = mach1 - mach0;
        if span.abs() < MIN_DIVISION_THRESHOLD {
            return cd0;
        }
        let t = (mach - mach0) / span;
        cd0 + t * (cd1 - cd0)
    }
}

/// Reference drag table for a falling body with transonic rise.
///
/// Subsonic plateau cd 0.5, peak cd 1.0 through the transonic band,
/// settling to 0.8 in the supersonic regime.
const CD_CONTROL_POINTS: &[(f64, f64)] = &[(0.8, 0.5), (1.0, 1.0), (1.2, 1.0), (1.5, 0.8)];

static CD_TABLE: Lazy<DragTable> = Lazy::new(|| DragTable::new(CD_CONTROL_POINTS.to_vec()));

/// Drag coefficient at `mach` from the reference table.
pub fn drag_coefficient(mach: f64) -> f64 {
    CD_TABLE.interpolate(mach)
}
