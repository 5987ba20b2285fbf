//! Physical constants used in descent calculations.

/// Standard gravitational acceleration at sea level (m/s²)
pub const STANDARD_GRAVITY: f64 = 9.80665;

/// Specific gas constant for dry air (J/(kg·K))
pub const GAS_CONSTANT_AIR: f64 = 287.05;

/// Heat capacity ratio for air
pub const ADIABATIC_INDEX: f64 = 1.4;

/// Mean Earth radius (m)
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Sea-level standard pressure (Pa)
pub const SEA_LEVEL_PRESSURE: f64 = 101_325.0;

/// Sea-level standard temperature (K)
pub const SEA_LEVEL_TEMPERATURE: f64 = 288.15;

/// Minimum threshold for preventing division by zero in general calculations
pub const MIN_DIVISION_THRESHOLD: f64 = 1e-12;

/// Lapse rates below this magnitude are treated as isothermal
pub const ISOTHERMAL_LAPSE_THRESHOLD: f64 = 1e-10;
