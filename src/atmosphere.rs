//! Stratified standard-atmosphere model.
//!
//! Temperature, pressure, density and speed of sound as functions of
//! altitude, backed by an immutable table of ISA layers. The table is
//! built once and is safe to share across concurrent simulation runs.

use once_cell::sync::Lazy;

use crate::constants::{
    ADIABATIC_INDEX, GAS_CONSTANT_AIR, ISOTHERMAL_LAPSE_THRESHOLD, SEA_LEVEL_PRESSURE,
    SEA_LEVEL_TEMPERATURE, STANDARD_GRAVITY,
};

/// One altitude band of the standard atmosphere.
#[derive(Debug, Clone)]
pub struct AtmosphereLayer {
    /// Base altitude of this layer (m)
    pub base_altitude: f64,
    /// Top altitude of this layer (m)
    pub top_altitude: f64,
    /// Temperature at the layer base (K)
    pub base_temperature: f64,
    /// Temperature lapse rate within the layer (K/m); zero means isothermal
    pub lapse_rate: f64,
    /// Pressure at the layer base (Pa)
    pub base_pressure: f64,
}

/// Atmospheric properties at a given altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphericProperties {
    /// Temperature (K)
    pub temperature: f64,
    /// Pressure (Pa)
    pub pressure: f64,
    /// Density (kg/m³)
    pub density: f64,
    /// Speed of sound (m/s)
    pub speed_of_sound: f64,
}

/// ISA layer boundaries and lapse rates up to 84.852 km:
/// (base altitude m, top altitude m, lapse rate K/m).
const ISA_LAYER_DEFS: &[(f64, f64, f64)] = &[
    (0.0, 11_000.0, -0.0065),     // Troposphere
    (11_000.0, 20_000.0, 0.0),    // Tropopause
    (20_000.0, 32_000.0, 0.001),  // Stratosphere 1
    (32_000.0, 47_000.0, 0.0028), // Stratosphere 2
    (47_000.0, 51_000.0, 0.0),    // Stratopause
    (51_000.0, 71_000.0, -0.0028), // Mesosphere 1
    (71_000.0, 84_852.0, -0.002), // Mesosphere 2
];

/// Immutable layer table; all lookups go through [`AtmosphereModel::properties`].
#[derive(Debug, Clone)]
pub struct AtmosphereModel {
    layers: Vec<AtmosphereLayer>,
}

impl AtmosphereModel {
    /// Build the standard-atmosphere table.
    ///
    /// Base temperature and pressure of each layer above the first are
    /// derived recursively from the layer below using the barometric
    /// formula, so both are continuous at every layer boundary.
    pub fn standard() -> Self {
        let mut layers: Vec<AtmosphereLayer> = Vec::with_capacity(ISA_LAYER_DEFS.len());

        for &(base_altitude, top_altitude, lapse_rate) in ISA_LAYER_DEFS {
            let (base_temperature, base_pressure) = match layers.last() {
                None => (SEA_LEVEL_TEMPERATURE, SEA_LEVEL_PRESSURE),
                Some(prev) => {
                    let thickness = base_altitude - prev.base_altitude;
                    temperature_pressure_in_layer(prev, thickness)
                }
            };

            layers.push(AtmosphereLayer {
                base_altitude,
                top_altitude,
                base_temperature,
                lapse_rate,
                base_pressure,
            });
        }

        AtmosphereModel { layers }
    }

    /// Top altitude of the highest layer (m).
    pub fn max_altitude(&self) -> f64 {
        self.layers.last().map_or(0.0, |layer| layer.top_altitude)
    }

    /// Atmospheric properties at `altitude`, clamped to the table range.
    pub fn properties(&self, altitude: f64) -> AtmosphericProperties {
        let altitude = altitude.clamp(0.0, self.max_altitude());

        // The exact table top falls through to the last layer.
        let layer = self
            .layers
            .iter()
            .find(|layer| altitude >= layer.base_altitude && altitude < layer.top_altitude)
            .unwrap_or_else(|| &self.layers[self.layers.len() - 1]);

        let (temperature, pressure) =
            temperature_pressure_in_layer(layer, altitude - layer.base_altitude);
        let density = pressure / (GAS_CONSTANT_AIR * temperature);
        let speed_of_sound = (ADIABATIC_INDEX * GAS_CONSTANT_AIR * temperature).sqrt();

        AtmosphericProperties {
            temperature,
            pressure,
            density,
            speed_of_sound,
        }
    }

    /// Read-only view of the layer table.
    pub fn layers(&self) -> &[AtmosphereLayer] {
        &self.layers
    }
}

/// Temperature and pressure `height_diff` meters above a layer base.
fn temperature_pressure_in_layer(layer: &AtmosphereLayer, height_diff: f64) -> (f64, f64) {
    if layer.lapse_rate.abs() < ISOTHERMAL_LAPSE_THRESHOLD {
        let temperature = layer.base_temperature;
        let pressure = layer.base_pressure
            * (-STANDARD_GRAVITY * height_diff / (GAS_CONSTANT_AIR * temperature)).exp();
        (temperature, pressure)
    } else {
        let temperature = layer.base_temperature + layer.lapse_rate * height_diff;
        let pressure = layer.base_pressure
            * (temperature / layer.base_temperature)
                .powf(-STANDARD_GRAVITY / (layer.lapse_rate * GAS_CONSTANT_AIR));
        (temperature, pressure)
    }
}

static STANDARD_ATMOSPHERE: Lazy<AtmosphereModel> = Lazy::new(AtmosphereModel::standard);

/// Shared standard-atmosphere table, built on first use.
pub fn standard_atmosphere() -> &'static AtmosphereModel {
    &STANDARD_ATMOSPHERE
}
