use std::convert::Infallible;

use tundra_core::{EquationProblem, Model};
use uom::si::time::second;

use crate::{
    column::SoilColumn,
    config::Config,
    error::ThermalError,
    node::{NodeSolution, ProfileRequest, frozen_soil_active, solve_profile},
    profile::NodeProfile,
    properties::{TwoLayerColumn, estimate_t1, maximum_unfrozen_water},
    vapor::{VaporPartition, VaporQuery},
};

use super::SurfaceInputs;

/// Soil state near the surface at the start of the step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundState {
    /// Surface temperature (°C).
    pub ts_old: f64,
    /// Temperature of node 1 (°C).
    pub t1_old: f64,
    /// Temperature at the damping depth (°C).
    pub deep: f64,
    pub kappa1: f64,
    pub kappa2: f64,
    pub cs1: f64,
    pub cs2: f64,
    /// Distance from the surface to node 1 (m).
    pub d1: f64,
    /// Distance from node 1 to node 2 (m).
    pub d2: f64,
    pub damping_depth: f64,
    /// Mean moisture of the top two nodes.
    pub moist: f64,
    /// Mean ice of the top two nodes.
    pub ice0: f64,
    pub max_moist: f64,
    pub bubble: f64,
    pub expt: f64,
}

impl GroundState {
    #[must_use]
    pub fn from_profile(column: &SoilColumn, profile: &NodeProfile) -> Self {
        let t = profile.temperature();
        let z = column.depths();
        let top = column.node(0);
        Self {
            ts_old: t[0],
            t1_old: t[1],
            deep: t[t.len() - 1],
            kappa1: profile.kappa()[0],
            kappa2: profile.kappa()[1],
            cs1: profile.heat_capacity()[0],
            cs2: profile.heat_capacity()[1],
            d1: z[1] - z[0],
            d2: z[2] - z[1],
            damping_depth: column.damping_depth(),
            moist: 0.5 * (profile.moist()[0] + profile.moist()[1]),
            ice0: 0.5 * (profile.ice()[0] + profile.ice()[1]),
            max_moist: top.max_moist,
            bubble: top.bubble,
            expt: top.expt,
        }
    }
}

/// Energy fluxes at the surface (W/m², positive toward the surface).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceFluxes {
    pub net_short: f64,
    pub net_long: f64,
    pub net_short_snow: f64,
    pub net_long_snow: f64,
    pub sensible: f64,
    pub latent: f64,
    pub latent_sub: f64,
    /// Conduction from node 1 to the surface.
    pub ground_flux: f64,
    /// Release of sensible heat stored in the top layer.
    pub delta_h: f64,
    /// Release of latent heat by freezing in the top layer.
    pub fusion: f64,
    /// Change of snow cold content.
    pub delta_cc: f64,
    /// Energy freezing liquid water in the snow, negative when melting.
    pub refreeze_energy: f64,
    /// Heat carried by rain onto a melting snow surface.
    pub advected_energy: f64,
    /// Heat the ground hands to an overlying pack: `ground_flux + delta_h +
    /// fusion` at the trial temperature. Filled in with or without snow.
    pub snow_flux: f64,
    /// Balance residual.
    pub error: f64,
    /// Temperature of node 1 (°C).
    pub t1: f64,
}

/// Everything computed at one trial surface temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceTrial {
    pub fluxes: SurfaceFluxes,
    /// Node solve, absent under quick flux.
    pub nodes: Option<NodeSolution>,
    /// Vapor exchange of a snowpack solved with the ground.
    pub snow_vapor: VaporPartition,
    /// Water gained by the soil surface (m per step).
    pub soil_water: f64,
}

/// Surface energy balance as a function of surface temperature.
///
/// Solving the node profile is part of every evaluation, so conduction and
/// the balance stay consistent at the root.
#[derive(Clone, Copy)]
pub struct SurfaceEnergyBalance<'a> {
    inputs: &'a SurfaceInputs<'a>,
    ground: GroundState,
    nodes: usize,
    no_flux: bool,
}

impl<'a> SurfaceEnergyBalance<'a> {
    /// Balance solved on the top `nodes` nodes of the column.
    #[must_use]
    pub fn new(inputs: &'a SurfaceInputs<'a>, nodes: usize, no_flux: bool) -> Self {
        Self {
            inputs,
            ground: GroundState::from_profile(inputs.column, inputs.profile),
            nodes,
            no_flux,
        }
    }

    #[must_use]
    pub fn ground(&self) -> &GroundState {
        &self.ground
    }

    fn vapor_query(&self, ts: f64, resistance: f64, dt: f64) -> VaporQuery {
        let forcing = &self.inputs.forcing;
        VaporQuery {
            surface_temperature: ts,
            air_temperature: forcing.air_temperature,
            air_density: forcing.air_density,
            pressure: forcing.pressure,
            vapor_pressure: forcing.vapor_pressure,
            vapor_pressure_deficit: forcing.vapor_pressure_deficit,
            resistance,
            dt,
            available_water: self.inputs.available_water,
        }
    }
}

impl Model for SurfaceEnergyBalance<'_> {
    type Input = f64;
    type Output = SurfaceTrial;
    type Error = ThermalError;

    #[allow(clippy::float_cmp)]
    fn call(&self, ts: &f64) -> Result<SurfaceTrial, ThermalError> {
        let ts = *ts;
        let inputs = self.inputs;
        let config = inputs.config;
        let c = config.constants();
        let g = &self.ground;
        let forcing = &inputs.forcing;
        let aero = &inputs.aerodynamics;
        let dt = inputs.dt.get::<second>();
        let coverage = inputs.snow.map_or(0.0, |snow| snow.coverage);
        let bare = 1.0 - coverage;
        let tk4 = (ts + c.kelvin).powi(4);

        let (t1, nodes) = if two_node_flux(inputs.column, config) {
            let layers = TwoLayerColumn {
                d1: g.d1,
                d2: g.d2,
                kappa1: g.kappa1,
                kappa2: g.kappa2,
                heat_capacity2: g.cs2,
                damping_depth: g.damping_depth,
            };
            (estimate_t1(ts, g.t1_old, g.deep, &layers, dt), None)
        } else {
            let request = ProfileRequest::new(inputs.column, inputs.profile, ts, dt)?
                .with_nodes(self.nodes)
                .with_no_flux(self.no_flux);
            let solution = solve_profile(&request, config)?;
            (solution.profile.temperature()[1], Some(solution))
        };

        let ground_flux = g.kappa1 / g.d1 * (t1 - ts);
        let delta_h = g.cs1 * ((g.ts_old + g.t1_old) - (ts + t1)) * g.d1 / (2.0 * dt);
        let layer_mean = 0.5 * (ts + t1);
        let ice = if frozen_soil_active(inputs.column, config) && layer_mean < 0.0 {
            (g.moist - maximum_unfrozen_water(layer_mean, g.max_moist, g.bubble, g.expt, c))
                .max(0.0)
        } else {
            0.0
        };
        let fusion = -c.ice_density * c.latent_heat_fusion * (g.ice0 - ice) * g.d1 / (2.0 * dt);

        let net_long = forcing.long_bare_in - bare * aero.emissivity * c.stefan_boltzmann * tk4;
        let resistance = aero.resistance(ts, forcing, aero.roughness, config);
        let bare_sensible =
            bare * forcing.air_density * c.air_heat_capacity * (forcing.air_temperature - ts)
                / resistance;
        let soil = inputs.vapor.soil(&self.vapor_query(ts, resistance, dt), c);

        let mut fluxes = SurfaceFluxes {
            net_short: forcing.net_short_bare,
            net_long,
            sensible: bare_sensible,
            latent: bare * soil.latent,
            latent_sub: bare * soil.latent_sub,
            ground_flux,
            delta_h,
            fusion,
            snow_flux: ground_flux + delta_h + fusion,
            t1,
            ..SurfaceFluxes::default()
        };

        let mut rest = fluxes.net_short
            + net_long
            + bare_sensible
            + fluxes.latent
            + fluxes.latent_sub
            + ground_flux
            + delta_h
            + fusion;

        let mut snow_vapor = VaporPartition::default();
        if let Some(snow) = inputs.snow {
            let net_long_snow = forcing.long_snow_in - coverage * c.stefan_boltzmann * tk4;
            let snow_resistance = aero.resistance(ts, forcing, aero.snow_roughness, config);
            let snow_sensible = coverage
                * forcing.air_density
                * c.air_heat_capacity
                * (forcing.air_temperature - ts)
                / snow_resistance;
            let vapor = inputs.vapor.snow(&self.vapor_query(ts, snow_resistance, dt), c);
            snow_vapor = vapor.partition;

            let advected_energy = if ts == 0.0 {
                c.volumetric_heat_water * forcing.air_temperature * forcing.rain / dt
            } else {
                0.0
            };
            let delta_cc = c.volumetric_heat_ice * snow.swq * (ts - snow.surface_temperature) / dt;

            fluxes.net_short_snow = forcing.net_short_snow;
            fluxes.net_long_snow = net_long_snow;
            fluxes.sensible += snow_sensible;
            fluxes.latent += coverage * vapor.latent;
            fluxes.latent_sub += coverage * vapor.latent_sub;
            fluxes.advected_energy = advected_energy;
            fluxes.delta_cc = delta_cc;

            rest += forcing.net_short_snow
                + net_long_snow
                + snow_sensible
                + coverage * (vapor.latent + vapor.latent_sub)
                + advected_energy
                - delta_cc;

            let refreeze_energy = snow.surface_water * c.latent_heat_fusion * c.water_density / dt;
            if ts == 0.0 && rest > -refreeze_energy {
                fluxes.refreeze_energy = -rest;
                fluxes.error = 0.0;
            } else {
                fluxes.refreeze_energy = refreeze_energy;
                fluxes.error = rest + refreeze_energy;
            }
        } else {
            fluxes.error = rest;
        }

        Ok(SurfaceTrial {
            fluxes,
            nodes,
            snow_vapor,
            soil_water: bare * soil.water,
        })
    }
}

/// Whether `T1` comes from the two-node closed form rather than a node
/// solve: under quick flux, or when neither the energy balance nor frozen
/// soil needs the profile.
pub(crate) fn two_node_flux(column: &SoilColumn, config: &Config) -> bool {
    let options = config.options();
    options.quick_flux || !(options.full_energy || frozen_soil_active(column, config))
}

/// Root-finding view of [`SurfaceEnergyBalance`]: the residual is the
/// balance error.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceResidual;

impl EquationProblem<1> for SurfaceResidual {
    type Input = f64;
    type Output = SurfaceTrial;
    type Error = Infallible;

    fn input(&self, x: &[f64; 1]) -> Result<f64, Infallible> {
        Ok(x[0])
    }

    fn residuals(&self, _input: &f64, output: &SurfaceTrial) -> Result<[f64; 1], Infallible> {
        Ok([output.fluxes.error])
    }
}
