//! Surface energy balance of a snowpack deep enough to be solved on its own.
//!
//! The ground below is seen only through its surface temperature; heat
//! conducted through the pack is returned so the caller can hand it to the
//! soil. Thin packs are solved together with the ground by
//! [`crate::surface`] instead.

use std::convert::Infallible;

use tundra_core::{EquationProblem, Model};
use tundra_solvers::equation::brent;
use uom::si::{f64::Time, time::second};

use crate::{
    config::Config,
    diagnostics::{Diagnostics, SnowDiagnostics},
    error::CellAborted,
    fallback::FallbackCounters,
    snow::{SnowMassBalance, SnowState, apply_snow_mass_balance},
    surface::{Aerodynamics, Forcing},
    vapor::{VaporFlux, VaporPartition, VaporQuery},
};

/// Everything the snowpack balance needs for one cell and time step.
#[derive(Clone, Copy)]
pub struct SnowpackInputs<'a> {
    pub config: &'a Config,
    pub forcing: Forcing,
    pub aerodynamics: Aerodynamics,
    pub dt: Time,
    /// Temperature of the ground surface under the pack (°C).
    pub ground_temperature: f64,
    pub snow: SnowState,
    pub vapor: &'a dyn VaporFlux,
    /// Counters carried over from the previous step.
    pub counters: &'a FallbackCounters,
}

/// Energy fluxes at the snow surface (W/m², positive toward the surface).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnowpackFluxes {
    pub net_short: f64,
    pub net_long: f64,
    pub sensible: f64,
    pub latent: f64,
    pub latent_sub: f64,
    pub advected_energy: f64,
    pub delta_cc: f64,
    /// Heat conducted from the ground up through the pack.
    pub ground_flux: f64,
    pub refreeze_energy: f64,
    pub error: f64,
}

/// Fluxes and vapor exchange at one trial temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnowTrial {
    pub fluxes: SnowpackFluxes,
    pub partition: VaporPartition,
}

/// Snowpack energy balance as a function of snow surface temperature.
#[derive(Clone, Copy)]
pub struct SnowpackEnergyBalance<'a> {
    inputs: &'a SnowpackInputs<'a>,
}

impl<'a> SnowpackEnergyBalance<'a> {
    #[must_use]
    pub fn new(inputs: &'a SnowpackInputs<'a>) -> Self {
        Self { inputs }
    }
}

impl Model for SnowpackEnergyBalance<'_> {
    type Input = f64;
    type Output = SnowTrial;
    type Error = Infallible;

    #[allow(clippy::float_cmp)]
    fn call(&self, ts: &f64) -> Result<SnowTrial, Infallible> {
        let ts = *ts;
        let SnowpackInputs {
            config,
            forcing,
            aerodynamics,
            dt,
            ground_temperature,
            snow,
            vapor,
            ..
        } = *self.inputs;
        let c = config.constants();
        let dt = dt.get::<second>();

        let net_long = forcing.long_snow_in - c.stefan_boltzmann * (ts + c.kelvin).powi(4);
        let resistance = aerodynamics.resistance(ts, &forcing, aerodynamics.snow_roughness, config);
        let sensible = forcing.air_density * c.air_heat_capacity * (forcing.air_temperature - ts)
            / resistance;

        let exchange = vapor.snow(
            &VaporQuery {
                surface_temperature: ts,
                air_temperature: forcing.air_temperature,
                air_density: forcing.air_density,
                pressure: forcing.pressure,
                vapor_pressure: forcing.vapor_pressure,
                vapor_pressure_deficit: forcing.vapor_pressure_deficit,
                resistance,
                dt,
                available_water: 0.0,
            },
            c,
        );

        let advected_energy = if ts == 0.0 {
            c.volumetric_heat_water * forcing.air_temperature * forcing.rain / dt
        } else {
            0.0
        };
        let delta_cc = c.volumetric_heat_ice * snow.surface_swq * (ts - snow.surface_temperature) / dt;
        let ground_flux = if snow.depth > 0.0 {
            let conductivity = c.snow_conductivity_coefficient * snow.density * snow.density;
            conductivity * (ground_temperature - ts) / snow.depth
        } else {
            0.0
        };

        let rest = forcing.net_short_snow
            + net_long
            + sensible
            + exchange.latent
            + exchange.latent_sub
            + advected_energy
            - delta_cc
            + ground_flux;

        let capacity = snow.surface_water * c.latent_heat_fusion * c.water_density / dt;
        let (refreeze_energy, error) = if ts == 0.0 && rest > -capacity {
            (-rest, 0.0)
        } else {
            (capacity, rest + capacity)
        };

        Ok(SnowTrial {
            fluxes: SnowpackFluxes {
                net_short: forcing.net_short_snow,
                net_long,
                sensible,
                latent: exchange.latent,
                latent_sub: exchange.latent_sub,
                advected_energy,
                delta_cc,
                ground_flux,
                refreeze_energy,
                error,
            },
            partition: exchange.partition,
        })
    }
}

/// Root-finding view of [`SnowpackEnergyBalance`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SnowResidual;

impl EquationProblem<1> for SnowResidual {
    type Input = f64;
    type Output = SnowTrial;
    type Error = Infallible;

    fn input(&self, x: &[f64; 1]) -> Result<f64, Infallible> {
        Ok(x[0])
    }

    fn residuals(&self, _input: &f64, output: &SnowTrial) -> Result<[f64; 1], Infallible> {
        Ok([output.fluxes.error])
    }
}

/// Result of a snowpack solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SnowpackSolution {
    /// Snow surface temperature (°C).
    pub temperature: f64,
    pub fluxes: SnowpackFluxes,
    /// Pack after vapor exchange, refreeze, and melt.
    pub snow: SnowMassBalance,
    pub counters: FallbackCounters,
    pub iterations: usize,
}

/// Solves the snowpack surface balance.
///
/// A pack whose balance closes at 0 °C is melting and needs no search.
///
/// # Errors
///
/// With fallback disabled, a failed search aborts the cell with
/// [`SnowDiagnostics`].
pub fn solve(inputs: &SnowpackInputs<'_>) -> Result<SnowpackSolution, CellAborted> {
    let config = inputs.config;
    let options = config.options();
    let model = SnowpackEnergyBalance::new(inputs);
    let ts_old = inputs.snow.surface_temperature;

    let melting = match model.call(&0.0) {
        Ok(trial) => trial,
        Err(never) => match never {},
    };

    let mut fell_back = false;
    let mut iterations = 0;
    #[allow(clippy::float_cmp)]
    let (ts, trial) = if melting.fluxes.error == 0.0 {
        (0.0, melting)
    } else {
        let half_width = options.brackets.snow;
        let bracket = [ts_old - half_width, (ts_old + half_width).min(0.0)];
        match brent::solve_unobserved(&model, &SnowResidual, bracket, config.root_finder()) {
            Ok(found) => {
                iterations = found.iters;
                (found.x, found.snapshot.output)
            }
            Err(error) => {
                if !options.fallback {
                    return Err(CellAborted::new(
                        error,
                        Diagnostics::Snow(Box::new(SnowDiagnostics {
                            bracket,
                            dt: inputs.dt.get::<second>(),
                            ground_temperature: inputs.ground_temperature,
                            forcing: inputs.forcing,
                            aerodynamics: inputs.aerodynamics,
                            snow: inputs.snow,
                        })),
                    ));
                }
                fell_back = true;
                let trial = match model.call(&ts_old) {
                    Ok(trial) => trial,
                    Err(never) => match never {},
                };
                (ts_old, trial)
            }
        }
    };

    let snow = apply_snow_mass_balance(
        &inputs.snow,
        trial.partition,
        trial.fluxes.refreeze_energy,
        ts,
        inputs.dt.get::<second>(),
        config.constants(),
    );

    let mut counters = inputs.counters.clone();
    counters.snow.record(fell_back);

    Ok(SnowpackSolution {
        temperature: ts,
        fluxes: trial.fluxes,
        snow,
        counters,
        iterations,
    })
}
