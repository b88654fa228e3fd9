use uom::si::f64::Time;

use crate::{
    column::SoilColumn, config::Config, fallback::FallbackCounters, profile::NodeProfile,
    snow::SnowState, vapor::VaporFlux,
};

/// Meteorological forcing at the surface for one time step.
///
/// Radiation terms are already partitioned between the snow-free and
/// snow-covered fractions by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forcing {
    /// Air temperature (°C).
    pub air_temperature: f64,
    /// Air density (kg/m³).
    pub air_density: f64,
    /// Air pressure (kPa).
    pub pressure: f64,
    /// Actual vapor pressure (kPa).
    pub vapor_pressure: f64,
    /// Vapor pressure deficit (kPa).
    pub vapor_pressure_deficit: f64,
    /// Net shortwave absorbed by snow-free ground (W/m²).
    pub net_short_bare: f64,
    /// Net shortwave absorbed by the snow surface (W/m²).
    pub net_short_snow: f64,
    /// Incoming longwave over snow-free ground (W/m²).
    pub long_bare_in: f64,
    /// Incoming longwave over snow (W/m²).
    pub long_snow_in: f64,
    /// Rain reaching the surface (m per step).
    pub rain: f64,
    /// Wind speed at the reference height (m/s).
    pub wind: f64,
}

/// Aerodynamic description of the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aerodynamics {
    /// Height of the wind and temperature measurements (m).
    pub reference_height: f64,
    /// Zero-plane displacement (m).
    pub displacement: f64,
    /// Roughness length of the snow-free surface (m).
    pub roughness: f64,
    /// Roughness length of the snow surface (m).
    pub snow_roughness: f64,
    /// Neutral aerodynamic resistance (s/m).
    pub resistance: f64,
    /// Longwave emissivity of the snow-free surface.
    pub emissivity: f64,
}

impl Aerodynamics {
    /// Stability-corrected resistance between `surface` and the air.
    pub(crate) fn resistance(
        &self,
        surface: f64,
        forcing: &Forcing,
        roughness: f64,
        config: &Config,
    ) -> f64 {
        if forcing.wind > 0.0 {
            self.resistance
                / crate::properties::stability_correction(
                    self.reference_height,
                    self.displacement,
                    surface,
                    forcing.air_temperature,
                    forcing.wind,
                    roughness,
                    config.constants(),
                )
        } else {
            config.constants().huge_resistance
        }
    }
}

/// Everything the surface balance needs for one cell and time step.
///
/// `profile` is the node state at the end of the previous step; its node 0
/// is the previous surface temperature. A thin snowpack solved together
/// with the ground is passed as `snow`; thicker packs go through
/// [`crate::snowpack`] instead.
#[derive(Clone, Copy)]
pub struct SurfaceInputs<'a> {
    pub config: &'a Config,
    pub column: &'a SoilColumn,
    pub profile: &'a NodeProfile,
    pub forcing: Forcing,
    pub aerodynamics: Aerodynamics,
    pub dt: Time,
    /// Volumetric moisture of each soil layer.
    pub layer_moist: &'a [f64],
    /// Water available for evaporation from the top layer (m).
    pub available_water: f64,
    pub snow: Option<SnowState>,
    pub vapor: &'a dyn VaporFlux,
    /// Counters carried over from the previous step.
    pub counters: &'a FallbackCounters,
}
