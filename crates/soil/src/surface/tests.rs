use super::*;

use approx::assert_relative_eq;
use tundra_solvers::equation::brent;
use uom::si::{f64::Time, time::hour};

use crate::{
    column::SoilColumn,
    config::{Config, Options},
    constants::PhysicalConstants,
    diagnostics::Diagnostics,
    error::AbortCause,
    fallback::FallbackCounters,
    profile::{
        NodeProfile,
        tests::{column, uniform},
    },
    snow::tests::thin_pack,
    surface::driver::quick_solve_nodes,
    vapor::BulkTransfer,
};

static BULK: BulkTransfer = BulkTransfer {
    blowing_fraction: 0.0,
};

const LAYER_MOIST: [f64; 3] = [0.3; 3];

fn config(options: Options) -> Config {
    Config::new(options, PhysicalConstants::default()).expect("valid config")
}

fn forcing(air_temperature: f64, net_short: f64) -> Forcing {
    Forcing {
        air_temperature,
        air_density: 1.25,
        pressure: 95.0,
        vapor_pressure: 0.6,
        vapor_pressure_deficit: 0.2,
        net_short_bare: net_short,
        net_short_snow: 0.0,
        long_bare_in: 300.0,
        long_snow_in: 0.0,
        rain: 0.0,
        wind: 3.0,
    }
}

fn aerodynamics() -> Aerodynamics {
    Aerodynamics {
        reference_height: 10.0,
        displacement: 0.0,
        roughness: 0.01,
        snow_roughness: 0.005,
        resistance: 50.0,
        emissivity: 0.97,
    }
}

fn inputs<'a>(
    config: &'a Config,
    column: &'a SoilColumn,
    profile: &'a NodeProfile,
    counters: &'a FallbackCounters,
) -> SurfaceInputs<'a> {
    SurfaceInputs {
        config,
        column,
        profile,
        forcing: forcing(5.0, 200.0),
        aerodynamics: aerodynamics(),
        dt: Time::new::<hour>(1.0),
        layer_moist: &LAYER_MOIST,
        available_water: 0.01,
        snow: None,
        vapor: &BULK,
        counters,
    }
}

#[test]
fn converged_surface_closes_the_balance() {
    let column = column(10);
    let profile = uniform(&column, 3.0, 0.3);
    let counters = FallbackCounters::new(10);

    let implicit = config(Options {
        implicit: true,
        ..Options::default()
    });
    let solution = solve(&inputs(&implicit, &column, &profile, &counters)).expect("solves");
    assert_relative_eq!(solution.fluxes.error, 0.0, epsilon = 1e-2);
    assert_relative_eq!(solution.profile.temperature()[0], solution.temperature);
    assert!(!solution.counters.surface.flag);

    let explicit = Config::default();
    let solution = solve(&inputs(&explicit, &column, &profile, &counters)).expect("solves");
    assert!(solution.fluxes.error.abs() < 1.0);
    assert_eq!(solution.counters.total(), 0);
}

#[test]
fn surface_follows_air_without_energy_balance() {
    let column = column(10);
    let profile = uniform(&column, 3.0, 0.3);
    let counters = FallbackCounters::new(10);
    let config = config(Options {
        full_energy: false,
        ..Options::default()
    });

    let solution = solve(&inputs(&config, &column, &profile, &counters)).expect("solves");

    assert_relative_eq!(solution.temperature, 5.0);
    assert_relative_eq!(solution.profile.temperature()[0], 5.0);
    assert_eq!(solution.iterations, 0);
    assert_eq!(solution.layers.temperature.len(), 3);
}

fn unbracketable() -> Options {
    let mut options = Options::default();
    options.brackets.surface = 0.01;
    options.root_finder.max_expansions = 0;
    options
}

#[test]
fn failed_search_falls_back_to_previous_temperature() {
    let column = column(10);
    let profile = uniform(&column, 3.0, 0.3);
    let mut counters = FallbackCounters::new(10);
    counters.surface.count = 4;
    let config = config(unbracketable());

    let mut surface = inputs(&config, &column, &profile, &counters);
    surface.forcing = forcing(3.0, 600.0);

    let mut events = Vec::new();
    let solution = solve_observed(&surface, |event: &SurfaceEvent| -> Option<brent::Action> {
        events.push(*event);
        None
    })
    .expect("falls back");

    assert_relative_eq!(solution.temperature, 3.0);
    assert!(solution.counters.surface.flag);
    assert_eq!(solution.counters.surface.count, 5);
    assert!(events.contains(&SurfaceEvent::Fallback {
        stage: Stage::Search,
        temperature: 3.0,
    }));
    assert!(matches!(
        events.last(),
        Some(SurfaceEvent::Accepted { iterations: 0, .. })
    ));
}

#[test]
fn failed_search_without_fallback_aborts_the_cell() {
    let column = column(10);
    let profile = uniform(&column, 3.0, 0.3);
    let counters = FallbackCounters::new(10);
    let config = config(Options {
        fallback: false,
        ..unbracketable()
    });

    let mut surface = inputs(&config, &column, &profile, &counters);
    surface.forcing = forcing(3.0, 600.0);
    let aborted = solve(&surface).expect_err("no sign change");

    assert!(matches!(
        aborted.cause,
        AbortCause::RootFinder(brent::Error::InvalidBracket(_))
    ));
    let Diagnostics::Surface(record) = &aborted.diagnostics else {
        panic!("expected surface diagnostics");
    };
    assert_eq!(record.nodes, 10);
    assert_relative_eq!(record.bracket[0], 2.99);
    assert!(aborted.diagnostics.to_string().contains("Ts_old = 3\n"));
}

#[test]
fn observer_can_stop_the_search() {
    let column = column(10);
    let profile = uniform(&column, 3.0, 0.3);
    let counters = FallbackCounters::new(10);
    let config = Config::default();

    let mut trials = 0;
    let solution = solve_observed(
        &inputs(&config, &column, &profile, &counters),
        |event: &SurfaceEvent| -> Option<brent::Action> {
            match event {
                SurfaceEvent::Trial {
                    stage: Stage::Search,
                    ..
                } => {
                    trials += 1;
                    Some(brent::Action::StopEarly)
                }
                _ => None,
            }
        },
    )
    .expect("stopped early");

    assert_eq!(trials, 1);
    assert_eq!(solution.iterations, 0);
    assert!(!solution.counters.surface.flag);
}

#[test]
fn cold_snow_refreezes_only_the_water_it_holds() {
    let column = column(10);
    let profile = uniform(&column, -1.0, 0.3);
    let counters = FallbackCounters::new(10);
    let config = Config::default();
    let pack = thin_pack();

    let mut surface = inputs(&config, &column, &profile, &counters);
    surface.forcing = Forcing {
        long_bare_in: 0.0,
        long_snow_in: 250.0,
        net_short_bare: 0.0,
        vapor_pressure: 0.2,
        ..forcing(-10.0, 0.0)
    };
    surface.snow = Some(pack);

    let solution = solve(&surface).expect("solves");
    let snow = solution.snow.expect("pack is updated");

    let c = config.constants();
    let capacity = pack.surface_water * c.latent_heat_fusion * c.water_density / 3600.0;
    assert!(solution.temperature < 0.0);
    assert_relative_eq!(snow.melt, 0.0);
    assert!(snow.refreeze_energy <= capacity * (1.0 + 1e-12));
    assert!(snow.state.surface_water >= 0.0);
    assert!(snow.state.surface_temperature <= 0.0);

    let fluxes = solution.fluxes;
    assert_relative_eq!(
        fluxes.snow_flux,
        fluxes.ground_flux + fluxes.delta_h + fluxes.fusion,
        epsilon = 1e-9
    );
}

#[test]
fn quick_solve_cuts_below_the_shallowest_thaw_front() {
    let temperature = [2.0, 1.0, -1.0, -2.0, -3.0, -3.0, -3.0, 1.0, 2.0, 2.0];
    assert_eq!(quick_solve_nodes(&temperature), 6);

    let frozen_surface = [-1.0, 1.0, 2.0, 2.0, 2.0, 2.0];
    assert_eq!(quick_solve_nodes(&frozen_surface), 6);

    let warm = [3.0; 10];
    assert_eq!(quick_solve_nodes(&warm), 3);
}
