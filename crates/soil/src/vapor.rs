//! Latent heat and vapor mass exchange at the surface.
//!
//! The surface and snowpack balances ask a [`VaporFlux`] for the latent
//! terms at each trial temperature. [`BulkTransfer`] is a self-contained
//! bulk-aerodynamic implementation; land-surface models with their own
//! evapotranspiration scheme provide another.

use crate::{
    constants::PhysicalConstants,
    properties::{latent_heat_sublimation, latent_heat_vaporization, saturated_vapor_pressure},
};

/// State of the surface and air at one trial temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VaporQuery {
    /// Trial surface temperature (°C).
    pub surface_temperature: f64,
    pub air_temperature: f64,
    /// Air density (kg/m³).
    pub air_density: f64,
    /// Air pressure (kPa).
    pub pressure: f64,
    /// Actual vapor pressure (kPa).
    pub vapor_pressure: f64,
    /// Vapor pressure deficit (kPa).
    pub vapor_pressure_deficit: f64,
    /// Stability-corrected aerodynamic resistance (s/m).
    pub resistance: f64,
    /// Time step (s).
    pub dt: f64,
    /// Water that can evaporate this step (m). Ignored over snow.
    pub available_water: f64,
}

/// Latent fluxes over soil.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SoilVapor {
    /// Latent heat of evaporation or condensation (W/m²).
    pub latent: f64,
    /// Latent heat of sublimation from frozen ground (W/m²).
    pub latent_sub: f64,
    /// Water gained by the surface (m per step; negative for evaporation).
    pub water: f64,
}

/// Split of the vapor exchange of a snowpack (m per step, negative when the
/// pack loses mass).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VaporPartition {
    /// Total exchange, `surface + blowing`.
    pub vapor: f64,
    /// Exchange from snow blown above the pack.
    pub blowing: f64,
    /// Exchange at the pack surface.
    pub surface: f64,
}

/// Latent fluxes over snow.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnowVapor {
    /// Latent heat of evaporation from a melting surface (W/m²).
    pub latent: f64,
    /// Latent heat of sublimation (W/m²).
    pub latent_sub: f64,
    pub partition: VaporPartition,
}

/// Provider of latent heat fluxes.
pub trait VaporFlux {
    fn soil(&self, query: &VaporQuery, constants: &PhysicalConstants) -> SoilVapor;

    fn snow(&self, query: &VaporQuery, constants: &PhysicalConstants) -> SnowVapor;
}

/// Bulk-aerodynamic vapor exchange.
///
/// The mass flux is `ρa·ε/p·(e - e_sat(Ts))/ra`. Over soil, evaporation is
/// limited to the available water. Over snow, sublimation (a flux away from
/// the surface) is suppressed when the vapor pressure deficit is zero, while
/// condensation is kept, and `blowing_fraction` of the exchange is
/// attributed to blowing snow.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BulkTransfer {
    pub blowing_fraction: f64,
}

impl BulkTransfer {
    /// Mass flux toward the surface (kg/m²/s).
    fn mass_flux(query: &VaporQuery, constants: &PhysicalConstants) -> f64 {
        query.air_density * (constants.vapor_weight_ratio / query.pressure)
            * (query.vapor_pressure - saturated_vapor_pressure(query.surface_temperature))
            / query.resistance
    }
}

impl VaporFlux for BulkTransfer {
    fn soil(&self, query: &VaporQuery, constants: &PhysicalConstants) -> SoilVapor {
        let per_step = query.dt / constants.water_density;
        let mut flux = Self::mass_flux(query, constants);

        let demand = -flux * per_step;
        if demand > query.available_water.max(0.0) {
            flux = -query.available_water.max(0.0) / per_step;
        }

        let t = query.surface_temperature;
        let (latent, latent_sub) = if t >= 0.0 {
            (latent_heat_vaporization(t) * flux, 0.0)
        } else {
            (0.0, latent_heat_sublimation(t) * flux)
        };

        SoilVapor {
            latent,
            latent_sub,
            water: flux * per_step,
        }
    }

    fn snow(&self, query: &VaporQuery, constants: &PhysicalConstants) -> SnowVapor {
        let mut flux = Self::mass_flux(query, constants);
        #[allow(clippy::float_cmp)]
        if query.vapor_pressure_deficit == 0.0 && flux < 0.0 {
            flux = 0.0;
        }

        let blowing = self.blowing_fraction * flux;
        let surface = flux - blowing;
        let vapor = surface + blowing;

        let t = query.surface_temperature;
        let (latent, latent_sub) = if t >= 0.0 {
            (latent_heat_vaporization(t) * vapor, 0.0)
        } else {
            (0.0, latent_heat_sublimation(t) * vapor)
        };

        let per_step = query.dt / constants.water_density;
        SnowVapor {
            latent,
            latent_sub,
            partition: VaporPartition {
                vapor: vapor * per_step,
                blowing: blowing * per_step,
                surface: surface * per_step,
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use approx::assert_relative_eq;

    pub(crate) fn query(surface_temperature: f64) -> VaporQuery {
        VaporQuery {
            surface_temperature,
            air_temperature: 5.0,
            air_density: 1.25,
            pressure: 95.0,
            vapor_pressure: 0.6,
            vapor_pressure_deficit: 0.27,
            resistance: 100.0,
            dt: 3600.0,
            available_water: 1.0,
        }
    }

    #[test]
    fn warm_soil_evaporates() {
        let c = PhysicalConstants::default();
        let vapor = BulkTransfer::default().soil(&query(10.0), &c);

        assert!(vapor.latent < 0.0);
        assert_relative_eq!(vapor.latent_sub, 0.0);
        assert!(vapor.water < 0.0);
    }

    #[test]
    fn evaporation_is_limited_by_available_water() {
        let c = PhysicalConstants::default();
        let mut dry = query(10.0);
        dry.available_water = 1e-6;
        let vapor = BulkTransfer::default().soil(&dry, &c);

        assert_relative_eq!(vapor.water, -1e-6, epsilon = 1e-15);
    }

    #[test]
    fn frozen_soil_sublimates() {
        let c = PhysicalConstants::default();
        let mut cold = query(-2.0);
        cold.vapor_pressure = 0.3;
        let vapor = BulkTransfer::default().soil(&cold, &c);

        assert_relative_eq!(vapor.latent, 0.0);
        assert!(vapor.latent_sub < 0.0);
    }

    #[test]
    fn snow_partition_adds_up() {
        let c = PhysicalConstants::default();
        let mut cold = query(-5.0);
        cold.vapor_pressure = 0.2;
        let vapor = BulkTransfer {
            blowing_fraction: 0.25,
        }
        .snow(&cold, &c);

        let p = vapor.partition;
        assert!(p.vapor < 0.0);
        assert_relative_eq!(p.vapor, p.surface + p.blowing);
        assert_relative_eq!(p.blowing, 0.25 * p.vapor);
        assert!(vapor.latent_sub < 0.0);
    }

    #[test]
    fn saturated_air_does_not_sublimate() {
        let c = PhysicalConstants::default();
        let mut saturated = query(-5.0);
        saturated.vapor_pressure = 0.2;
        saturated.vapor_pressure_deficit = 0.0;
        let vapor = BulkTransfer::default().snow(&saturated, &c);

        assert_relative_eq!(vapor.partition.vapor, 0.0);
        assert_relative_eq!(vapor.latent_sub, 0.0);
    }

    #[test]
    fn saturated_air_still_condenses_on_snow() {
        let c = PhysicalConstants::default();
        let mut humid = query(-5.0);
        humid.vapor_pressure = 0.6;
        humid.vapor_pressure_deficit = 0.0;
        let vapor = BulkTransfer::default().snow(&humid, &c);

        assert!(vapor.partition.vapor > 0.0);
        assert!(vapor.latent_sub > 0.0);
    }
}
