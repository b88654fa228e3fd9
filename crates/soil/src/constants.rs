use serde::{Deserialize, Serialize};

/// Physical constants used by every balance and conduction equation.
///
/// Values are SI unless noted. Heat capacities with a `volumetric_` prefix
/// are per cubic metre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicalConstants {
    /// Offset between degrees Celsius and kelvin.
    pub kelvin: f64,
    /// Stefan–Boltzmann constant (W/m²/K⁴).
    pub stefan_boltzmann: f64,
    /// Latent heat of fusion (J/kg).
    pub latent_heat_fusion: f64,
    /// Density of liquid water (kg/m³).
    pub water_density: f64,
    /// Density of ice (kg/m³).
    pub ice_density: f64,
    /// Specific heat of moist air at constant pressure (J/kg/K).
    pub air_heat_capacity: f64,
    /// Volumetric heat capacity of ice (J/m³/K).
    pub volumetric_heat_ice: f64,
    /// Volumetric heat capacity of liquid water (J/m³/K).
    pub volumetric_heat_water: f64,
    /// Coefficient `k` in the snow conductivity `k · ρ²` (W·m⁵/kg²/K).
    pub snow_conductivity_coefficient: f64,
    /// Gravitational acceleration (m/s²).
    pub gravity: f64,
    /// Ratio of molecular weights of water vapor and dry air.
    pub vapor_weight_ratio: f64,
    /// Aerodynamic resistance used when there is no wind (s/m).
    pub huge_resistance: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            kelvin: 273.15,
            stefan_boltzmann: 5.6696e-8,
            latent_heat_fusion: 3.337e5,
            water_density: 999.842_594,
            ice_density: 917.0,
            air_heat_capacity: 1013.0,
            volumetric_heat_ice: 2100e3,
            volumetric_heat_water: 4186.8e3,
            snow_conductivity_coefficient: 2.9302e-6,
            gravity: 9.81,
            vapor_weight_ratio: 0.621_963_51,
            huge_resistance: 1e20,
        }
    }
}
