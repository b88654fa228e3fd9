//! The soil balances driven directly through the solvers, with the shared
//! observers watching.

use approx::assert_relative_eq;
use tundra_observers::record::{GoodEnough, ResidualTrace};
use tundra_soil::{
    Config, FallbackCounters, NodeLayout, NodeProfile, SnowState, SoilColumn, SoilLayer,
    node::{ProfileRequest, ProfileResidual},
    properties::SoilTexture,
    snowpack::{SnowResidual, SnowpackEnergyBalance, SnowpackInputs},
    surface::{Aerodynamics, Forcing},
    vapor::BulkTransfer,
};
use tundra_solvers::equation::{brent, newton};
use uom::si::{
    f64::{Length, Time},
    length::meter,
    time::hour,
};

static BULK: BulkTransfer = BulkTransfer {
    blowing_fraction: 0.0,
};

fn column() -> SoilColumn {
    let texture = SoilTexture {
        quartz: 0.4,
        organic: 0.05,
        bulk_density: 1400.0,
        soil_density: 2650.0,
        bulk_density_mineral: 1450.0,
        soil_density_mineral: 2685.0,
    };
    let layers = [0.1, 0.4, 1.0].map(|thickness| SoilLayer {
        thickness: Length::new::<meter>(thickness),
        max_moist: 0.45,
        bubble: 20.0,
        expt: 10.0,
        texture,
    });
    SoilColumn::new(NodeLayout::Linear { nodes: 10 }, &layers, Length::new::<meter>(4.0))
        .expect("valid column")
}

#[test]
fn residual_trace_follows_the_snowpack_search() {
    let config = Config::default();
    let counters = FallbackCounters::new(3);
    let inputs = SnowpackInputs {
        config: &config,
        forcing: Forcing {
            air_temperature: -2.0,
            air_density: 1.3,
            pressure: 90.0,
            vapor_pressure: 0.4,
            vapor_pressure_deficit: 0.117,
            net_short_bare: 0.0,
            net_short_snow: 20.0,
            long_bare_in: 0.0,
            long_snow_in: 250.0,
            rain: 0.0,
            wind: 3.0,
        },
        aerodynamics: Aerodynamics {
            reference_height: 2.0,
            displacement: 0.0,
            roughness: 0.01,
            snow_roughness: 0.005,
            resistance: 80.0,
            emissivity: 1.0,
        },
        dt: Time::new::<hour>(1.0),
        ground_temperature: -2.0,
        snow: SnowState {
            swq: 0.05,
            surface_swq: 0.05,
            density: 250.0,
            depth: 0.2,
            surface_temperature: -4.0,
            pack_temperature: -4.0,
            surface_water: 0.0,
            pack_water: 0.0,
            coverage: 1.0,
            cold_content: 0.0,
        },
        vapor: &BULK,
        counters: &counters,
    };

    let mut trace = ResidualTrace::new();
    let solution = brent::solve(
        &SnowpackEnergyBalance::new(&inputs),
        &SnowResidual,
        [-9.0, 0.0],
        config.root_finder(),
        &mut trace,
    )
    .expect("pack balance has a root below freezing");

    assert!(trace.residuals().len() >= 2);
    assert_relative_eq!(trace.last().expect("events"), solution.residual);
    assert!(solution.x > -9.0 && solution.x < 0.0);
}

#[test]
fn good_enough_cuts_the_profile_solve_short() {
    let column = column();
    let config = Config::default();
    let previous = NodeProfile::from_layers(
        &column,
        &[-1.0; 10],
        &[0.3, 0.3, 0.3],
        true,
        config.constants(),
    )
    .expect("valid profile");
    let request = ProfileRequest::new(&column, &previous, -12.0, 3600.0).expect("valid request");
    let system = ProfileResidual::new(&request, true, config.constants());

    let full = newton::solve_unobserved(&system, &system.initial(), config.newton())
        .expect("converges");
    let loose = newton::solve(
        &system,
        &system.initial(),
        config.newton(),
        GoodEnough::new(1.0, 1),
    )
    .expect("stops or converges");

    assert!(loose.iters <= full.iters);
    if loose.status == newton::Status::StoppedByObserver {
        assert!(loose.max_residual() <= 1.0);
    }
}
