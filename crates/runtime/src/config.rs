//! Run configuration
//!
//! Orbital, cadence and physical parameters. Read-only for the duration of
//! a run; replaced wholesale between runs.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Orbital and scheduling configuration for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Simulated seconds per physics step
    pub dt: f64,
    /// Simulated seconds per orbit
    pub year_length: f64,
    /// Planetary rotations per orbit
    pub rotations_per_year: f64,
    /// Physics steps per orbit
    pub steps_per_orbit: u32,
    /// Historical samples recorded per orbit
    pub samples_per_orbit: u32,
    /// Atmosphere layer count
    pub layers: usize,
    /// Physical constants and kernel coefficients
    #[serde(default)]
    pub physics: PhysicsConfig,
}

impl SimConfig {
    /// Validate invariants the engine relies on.
    pub fn validate(&self) -> Result<()> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(Error::InvalidConfig("dt must be positive".to_string()));
        }
        if !(self.year_length > 0.0 && self.year_length.is_finite()) {
            return Err(Error::InvalidConfig(
                "year_length must be positive".to_string(),
            ));
        }
        if self.steps_per_orbit == 0 {
            return Err(Error::InvalidConfig(
                "steps_per_orbit must be > 0".to_string(),
            ));
        }
        if self.samples_per_orbit == 0 {
            return Err(Error::InvalidConfig(
                "samples_per_orbit must be > 0".to_string(),
            ));
        }
        if self.samples_per_orbit > self.steps_per_orbit {
            return Err(Error::InvalidConfig(
                "samples_per_orbit must not exceed steps_per_orbit".to_string(),
            ));
        }
        if self.layers == 0 {
            return Err(Error::InvalidConfig("layers must be > 0".to_string()));
        }
        Ok(())
    }

    /// Physics steps between recorded samples. May be fractional.
    pub fn steps_per_sample(&self) -> f64 {
        self.steps_per_orbit as f64 / self.samples_per_orbit as f64
    }

    /// Ring depth retaining at least one full orbit at all times.
    pub fn ring_depth(&self) -> usize {
        2 * self.samples_per_orbit as usize
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 3_600.0,
            year_length: 3.15576e7,
            rotations_per_year: 365.25,
            steps_per_orbit: 8_766,
            samples_per_orbit: 512,
            layers: 4,
            physics: PhysicsConfig::default(),
        }
    }
}

/// Physical constants and per-pass coefficients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Top-of-atmosphere stellar flux, W/m^2
    pub solar_constant: f64,
    /// Axial tilt, radians
    pub obliquity: f64,
    /// Surface longwave emissivity
    pub surface_emissivity: f64,
    /// Per-layer longwave absorptivity (= emissivity)
    pub layer_absorptivity: f64,
    /// Per-layer shortwave absorption fraction
    pub shortwave_extinction: f64,
    /// Shortwave fraction reflected by full cloud cover, per layer
    pub cloud_reflectivity: f64,
    /// Albedo applied over frozen cells
    pub ice_albedo: f64,
    /// Ice mass at which a cell counts as fully frozen, kg/m^2
    pub ice_cover_mass: f64,
    /// Freezing point, K
    pub freezing_point: f64,
    /// Latent heat of fusion, J/kg
    pub latent_heat_fusion: f64,
    /// Latent heat of vaporization, J/kg
    pub latent_heat_vapor: f64,
    /// Phase-change rate, kg/m^2 per K of departure per second
    pub phase_rate: f64,
    /// Evaporation rate, kg/m^2 per unit saturation deficit per second
    pub evaporation_rate: f64,
    /// Bare-surface areal heat capacity, J/m^2/K
    pub surface_heat_capacity: f64,
    /// Specific heat of stored water and ice, J/kg/K
    pub water_specific_heat: f64,
    /// Areal heat capacity of one atmosphere layer, J/m^2/K
    pub layer_heat_capacity: f64,
    /// Air mass of one atmosphere layer, kg/m^2 (converts moisture mixing
    /// ratio to areal water mass)
    pub layer_air_mass: f64,
    /// Temperature drop per layer above which convection triggers, K
    pub adiabatic_lapse: f64,
    /// Fraction of the unstable excess removed per convective sweep, in (0, 1]
    pub mixing_strength: f64,
    /// Fraction of a layer's moisture lifted per fully unstable sweep
    pub moisture_mixing: f64,
    /// Relative humidity at which cloud begins to form
    pub condensation_humidity: f64,
    /// Atmospheric scale height, m (thins the column over high terrain)
    pub scale_height: f64,
    /// Lateral heat diffusivity, 1/s against the neighbour-mean gradient
    pub diffusivity: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            solar_constant: 1361.0,
            obliquity: 0.4091,
            surface_emissivity: 0.95,
            layer_absorptivity: 0.35,
            shortwave_extinction: 0.08,
            cloud_reflectivity: 0.45,
            ice_albedo: 0.6,
            ice_cover_mass: 10.0,
            freezing_point: 273.15,
            latent_heat_fusion: 3.34e5,
            latent_heat_vapor: 2.5e6,
            phase_rate: 1.0e-5,
            evaporation_rate: 2.0e-4,
            surface_heat_capacity: 2.0e6,
            water_specific_heat: 4_186.0,
            layer_heat_capacity: 1.0e6,
            layer_air_mass: 2.5e3,
            adiabatic_lapse: 6.5,
            mixing_strength: 0.5,
            moisture_mixing: 0.25,
            condensation_humidity: 0.7,
            scale_height: 8_000.0,
            diffusivity: 2.0e-6,
        }
    }
}
