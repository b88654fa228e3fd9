use tundra_core::{Model, Observer};
use tundra_solvers::equation::brent;
use uom::si::time::second;

use crate::{
    column::NodeVec,
    diagnostics::{Diagnostics, SurfaceDiagnostics},
    error::{CellAborted, ThermalError},
    fallback::FallbackCounters,
    layers::{LayerSummary, reconcile},
    node::frozen_soil_active,
    profile::NodeProfile,
    snow::{SnowMassBalance, apply_snow_mass_balance},
};

use super::{
    GroundState, Stage, SurfaceEnergyBalance, SurfaceEvent, SurfaceFluxes, SurfaceInputs,
    SurfaceResidual, SurfaceTrial,
};

/// Result of a surface solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSolution {
    /// Surface temperature (°C).
    pub temperature: f64,
    pub fluxes: SurfaceFluxes,
    /// Node state at the end of the step.
    pub profile: NodeProfile,
    pub layers: LayerSummary,
    /// Thin snowpack after its mass update, if one was present.
    pub snow: Option<SnowMassBalance>,
    /// Water gained by the soil surface (m per step).
    pub soil_water: f64,
    /// Counters including this step.
    pub counters: FallbackCounters,
    /// Root-finder iterations across every search stage.
    pub iterations: usize,
}

/// Solves the surface energy balance for one cell and time step.
///
/// # Errors
///
/// With fallback disabled, any failure of the surface search or of a node
/// solve aborts the cell. The returned [`CellAborted`] carries the inputs
/// of the failed balance.
pub fn solve(inputs: &SurfaceInputs<'_>) -> Result<SurfaceSolution, CellAborted> {
    solve_observed(inputs, ())
}

/// Like [`solve`], reporting progress to `observer`.
///
/// Returning [`brent::Action::StopEarly`] from a trial event ends that
/// search and accepts its best point.
///
/// # Errors
///
/// See [`solve`].
pub fn solve_observed<Obs>(
    inputs: &SurfaceInputs<'_>,
    mut observer: Obs,
) -> Result<SurfaceSolution, CellAborted>
where
    Obs: Observer<SurfaceEvent, brent::Action>,
{
    let config = inputs.config;
    let options = config.options();
    let nodes = inputs.column.node_count();
    let ts_old = inputs.profile.temperature()[0];

    let mut iterations = 0;
    let mut surface_fell_back = false;
    let mut ts = inputs.forcing.air_temperature;

    if options.full_energy {
        let quick = options.quick_solve && !options.quick_flux;
        let bracket = surface_bracket(inputs, ts_old);

        let (search_nodes, search_no_flux) = if quick {
            (quick_solve_nodes(inputs.profile.temperature()), false)
        } else {
            (nodes, options.no_flux)
        };

        let found = run_stage(
            inputs,
            (search_nodes, search_no_flux),
            bracket,
            Stage::Search,
            &mut observer,
        )?;
        let refined = match found {
            Some((x, iters)) if quick && ts_old * x < 0.0 => {
                iterations += iters;
                run_stage(
                    inputs,
                    (nodes, options.no_flux),
                    bracket,
                    Stage::Refine,
                    &mut observer,
                )?
            }
            other => other,
        };
        match refined {
            Some((x, iters)) => {
                iterations += iters;
                ts = x;
            }
            None => {
                surface_fell_back = true;
                ts = ts_old;
            }
        }
    }

    let model = SurfaceEnergyBalance::new(inputs, nodes, options.no_flux);
    let trial = model.call(&ts).map_err(|error| {
        let bracket = [ts, ts];
        CellAborted::new(
            error,
            surface_diagnostics(inputs, bracket, nodes, options.no_flux),
        )
    })?;
    observer.observe(&SurfaceEvent::Trial {
        stage: Stage::Final,
        iter: 0,
        temperature: ts,
        residual: trial.fluxes.error,
    });

    let SurfaceTrial {
        fluxes,
        nodes: node_solution,
        snow_vapor,
        soil_water,
    } = trial;

    let (profile, node_fallbacks) = match node_solution {
        Some(solution) => (solution.profile, solution.fallbacks),
        None => {
            let mut temperature: NodeVec<f64> =
                inputs.profile.temperature().iter().copied().collect();
            temperature[0] = ts;
            temperature[1] = fluxes.t1;
            let profile = inputs.profile.with_temperatures(
                inputs.column,
                &temperature,
                2,
                frozen_soil_active(inputs.column, config),
                config.constants(),
            );
            (profile, NodeVec::new())
        }
    };

    let layers = reconcile(inputs.column, &profile, inputs.layer_moist, config).map_err(|error| {
        CellAborted::new(
            ThermalError::from(error),
            surface_diagnostics(inputs, [ts, ts], nodes, options.no_flux),
        )
    })?;

    let snow = inputs.snow.map(|snow| {
        apply_snow_mass_balance(
            &snow,
            snow_vapor,
            fluxes.refreeze_energy,
            ts,
            inputs.dt.get::<second>(),
            config.constants(),
        )
    });

    let mut counters = inputs.counters.clone();
    counters.surface.record(surface_fell_back);
    counters.record_nodes(&node_fallbacks);

    observer.observe(&SurfaceEvent::Accepted {
        temperature: ts,
        residual: fluxes.error,
        iterations,
    });

    Ok(SurfaceSolution {
        temperature: ts,
        fluxes,
        profile,
        layers,
        snow,
        soil_water,
        counters,
        iterations,
    })
}

/// Runs one search stage.
///
/// Returns the root and iteration count, or `None` when the search failed
/// and fallback keeps the previous temperature.
fn run_stage<Obs>(
    inputs: &SurfaceInputs<'_>,
    (nodes, no_flux): (usize, bool),
    bracket: [f64; 2],
    stage: Stage,
    observer: &mut Obs,
) -> Result<Option<(f64, usize)>, CellAborted>
where
    Obs: Observer<SurfaceEvent, brent::Action>,
{
    match search(inputs, nodes, no_flux, bracket, stage, observer) {
        Ok(found) => Ok(Some((found.x, found.iters))),
        Err(_) if inputs.config.options().fallback => {
            observer.observe(&SurfaceEvent::Fallback {
                stage,
                temperature: inputs.profile.temperature()[0],
            });
            Ok(None)
        }
        Err(error) => Err(CellAborted::new(
            error,
            surface_diagnostics(inputs, bracket, nodes, no_flux),
        )),
    }
}

/// Runs one Brent search, forwarding its trials to `observer`.
fn search<Obs>(
    inputs: &SurfaceInputs<'_>,
    nodes: usize,
    no_flux: bool,
    bracket: [f64; 2],
    stage: Stage,
    observer: &mut Obs,
) -> Result<brent::Solution<f64, SurfaceTrial>, brent::Error>
where
    Obs: Observer<SurfaceEvent, brent::Action>,
{
    let model = SurfaceEnergyBalance::new(inputs, nodes, no_flux);
    brent::solve(
        &model,
        &SurfaceResidual,
        bracket,
        inputs.config.root_finder(),
        |event: &brent::Event<'_, f64, SurfaceTrial>| {
            observer.observe(&SurfaceEvent::Trial {
                stage,
                iter: event.iter,
                temperature: event.x(),
                residual: event.residual(),
            })
        },
    )
}

/// Initial search interval for the surface temperature.
///
/// A snow-covered surface cannot be warmer than 0 °C.
fn surface_bracket(inputs: &SurfaceInputs<'_>, ts_old: f64) -> [f64; 2] {
    let half_width = inputs.config.options().brackets.surface;
    if inputs.snow.is_some() {
        [(ts_old - half_width).min(-half_width), 0.0]
    } else {
        let middle = 0.5 * (ts_old + inputs.forcing.air_temperature);
        [middle - half_width, middle + half_width]
    }
}

/// Number of nodes solved during a quick-solve search.
///
/// The column is cut four nodes below the shallowest node at or above 0 °C
/// that sits over a frozen node. Without one, the whole column is used when
/// the surface is at or below freezing over thawed soil, and three nodes
/// otherwise.
pub(crate) fn quick_solve_nodes(temperature: &[f64]) -> usize {
    let n = temperature.len();
    let front = (0..n.saturating_sub(4))
        .find(|&j| temperature[j] >= 0.0 && temperature[j + 1] < 0.0);

    match front {
        Some(j) => j + 5,
        None if temperature[0] <= 0.0 && temperature[1] >= 0.0 => n,
        None => 3,
    }
}

fn surface_diagnostics(
    inputs: &SurfaceInputs<'_>,
    bracket: [f64; 2],
    nodes: usize,
    no_flux: bool,
) -> Diagnostics {
    Diagnostics::Surface(Box::new(SurfaceDiagnostics {
        bracket,
        nodes,
        no_flux,
        dt: inputs.dt.get::<second>(),
        ground: GroundState::from_profile(inputs.column, inputs.profile),
        forcing: inputs.forcing,
        aerodynamics: inputs.aerodynamics,
        snow: inputs.snow,
        temperatures: inputs.profile.temperature().iter().copied().collect(),
    }))
}
