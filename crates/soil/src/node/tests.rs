use super::*;

use approx::assert_relative_eq;
use tundra_core::ResidualSystem;
use tundra_solvers::equation::{brent, newton};

use crate::{
    config::{Grid, Options},
    constants::PhysicalConstants,
    fallback::FallbackCounters,
    profile::tests::{column, uniform},
};

fn config(options: Options) -> Config {
    Config::new(options, PhysicalConstants::default()).expect("valid config")
}

fn explicit() -> Config {
    Config::default()
}

fn implicit() -> Config {
    config(Options {
        implicit: true,
        ..Options::default()
    })
}

#[test]
fn steady_warm_profile_does_not_change() {
    let column = column(10);
    let profile = uniform(&column, 3.0, 0.3);

    for config in [explicit(), implicit()] {
        let request = ProfileRequest::new(&column, &profile, 3.0, 3600.0).expect("valid request");
        let solution = solve_profile(&request, &config).expect("solves");

        for &t in solution.profile.temperature() {
            assert_relative_eq!(t, 3.0, epsilon = 1e-6);
        }
        assert!(!solution.fell_back());
    }
}

#[test]
fn column_at_freezing_stays_at_freezing() {
    let column = column(10);
    let profile = uniform(&column, 0.0, 0.3);

    for config in [explicit(), implicit()] {
        let request = ProfileRequest::new(&column, &profile, 0.0, 3600.0)
            .expect("valid request")
            .with_no_flux(true);
        let solution = solve_profile(&request, &config).expect("solves");

        for &t in solution.profile.temperature() {
            assert_relative_eq!(t, 0.0, epsilon = 1e-6);
        }
        assert!(solution.profile.ice().iter().all(|&ice| ice == 0.0));
    }
}

#[test]
fn warm_surface_heats_the_top_node() {
    let column = column(10);
    let profile = uniform(&column, 2.0, 0.3);

    for config in [explicit(), implicit()] {
        let request = ProfileRequest::new(&column, &profile, 12.0, 3600.0).expect("valid request");
        let solution = solve_profile(&request, &config).expect("solves");
        let t = solution.profile.temperature();

        assert_relative_eq!(t[0], 12.0);
        assert!(t[1] > 2.0 && t[1] < 12.0);
        assert!(t[1] >= t[2]);
        assert_relative_eq!(t[9], 2.0);
    }
}

#[test]
fn cold_surface_freezes_the_top_node() {
    let column = column(10);
    let profile = uniform(&column, -0.5, 0.3);

    for config in [explicit(), implicit()] {
        let request = ProfileRequest::new(&column, &profile, -15.0, 3600.0).expect("valid request");
        let solution = solve_profile(&request, &config).expect("solves");
        let after = &solution.profile;

        assert!(after.temperature()[1] < -0.5);
        assert!(after.ice()[1] > profile.ice()[1]);
        assert!(after.ice()[1] <= after.moist()[1]);
    }
}

#[test]
fn implicit_solution_zeroes_every_residual() {
    let column = column(12);
    let profile = uniform(&column, -1.0, 0.35);
    let config = implicit();

    let request = ProfileRequest::new(&column, &profile, -12.0, 3600.0)
        .expect("valid request")
        .with_no_flux(true);
    let solution = solve_profile(&request, &config).expect("solves");

    let system = ProfileResidual::new(&request, true, config.constants());
    assert_eq!(system.len(), 11);

    let x = &solution.profile.temperature()[1..];
    let mut residuals = vec![0.0; system.len()];
    system.residuals(x, &mut residuals).expect("infallible");

    for r in residuals {
        assert_relative_eq!(r, 0.0, epsilon = 1e-3);
    }
}

#[test]
fn implicit_residuals_on_exponential_grid() {
    let column = SoilColumn::new(
        crate::column::NodeLayout::Exponential { nodes: 20 },
        &crate::column::tests::three_layers(),
        crate::column::tests::m(4.0),
    )
    .expect("valid column");
    let profile = uniform(&column, 1.0, 0.3);
    let config = config(Options {
        implicit: true,
        grid: Grid::Exponential,
        ..Options::default()
    });

    let request = ProfileRequest::new(&column, &profile, -6.0, 3600.0).expect("valid request");
    let solution = solve_profile(&request, &config).expect("solves");

    let system = ProfileResidual::new(&request, true, config.constants());
    let x = &solution.profile.temperature()[1..19];
    let mut residuals = vec![0.0; system.len()];
    system.residuals(x, &mut residuals).expect("infallible");

    for r in residuals {
        assert_relative_eq!(r, 0.0, epsilon = 1e-3);
    }
    assert!(solution.profile.temperature()[1] < 1.0);
}

#[test]
fn reduced_column_leaves_deep_nodes_alone() {
    let column = column(10);
    let profile = uniform(&column, 2.0, 0.3);
    let request = ProfileRequest::new(&column, &profile, 8.0, 3600.0)
        .expect("valid request")
        .with_no_flux(true)
        .with_nodes(4);

    assert_eq!(request.nodes(), 4);
    assert!(!request.no_flux());

    let solution = solve_profile(&request, &explicit()).expect("solves");
    let t = solution.profile.temperature();
    assert!(t[1] > 2.0);
    assert_relative_eq!(t[3], 2.0);
    assert_eq!(solution.profile.temperature()[4..], profile.temperature()[4..]);
}

#[test]
fn sweep_limit_without_fallback_is_an_error() {
    let column = column(10);
    let profile = uniform(&column, 0.5, 0.3);
    let mut options = Options {
        fallback: false,
        ..Options::default()
    };
    options.explicit.max_sweeps = 1;

    let request = ProfileRequest::new(&column, &profile, 10.0, 3600.0).expect("valid request");
    let error = solve_profile(&request, &config(options)).expect_err("one sweep is not enough");

    assert!(matches!(error, ThermalError::SweepLimit { sweeps: 1, .. }));
}

#[test]
fn sweep_limit_with_fallback_keeps_previous_temperatures() {
    let column = column(10);
    let profile = uniform(&column, 0.5, 0.3);
    let mut options = Options::default();
    options.explicit.max_sweeps = 1;

    let request = ProfileRequest::new(&column, &profile, 10.0, 3600.0).expect("valid request");
    let solution = solve_profile(&request, &config(options)).expect("falls back");

    assert!(solution.fell_back());
    assert!(solution.fallbacks[1..9].iter().all(|&events| events == 1));
    assert_eq!(solution.fallbacks[0], 0);
    for &t in &solution.profile.temperature()[1..] {
        assert_relative_eq!(t, 0.5);
    }
}

#[test]
fn request_checks_profile_length() {
    let short = column(6);
    let long = column(10);
    let profile = uniform(&short, 1.0, 0.3);

    let error = ProfileRequest::new(&long, &profile, 1.0, 3600.0).expect_err("mismatch");
    assert!(matches!(
        error,
        ProfileError::LengthMismatch {
            expected: 10,
            found: 6,
            ..
        }
    ));
}

/// Node 4 starts colder than its neighbours and still holds ice. With
/// freezing switched off that ice melts at once, dragging the node far
/// below both neighbours during the step.
fn cold_spike(column: &SoilColumn) -> NodeProfile {
    let base = uniform(column, 1.0, 0.3);
    let mut temperature = vec![1.0; column.node_count()];
    let mut ice = vec![0.0; column.node_count()];
    temperature[4] = 0.5;
    ice[4] = 0.2;
    NodeProfile::new(
        &temperature,
        &ice,
        base.moist(),
        base.kappa(),
        base.heat_capacity(),
    )
    .expect("valid profile")
}

#[test]
fn cold_nose_is_smoothed_and_counted() {
    let column = column(10);
    let profile = cold_spike(&column);
    let config = config(Options {
        frozen_soil: false,
        ..Options::default()
    });

    let request = ProfileRequest::new(&column, &profile, 1.0, 3600.0).expect("valid request");
    let solution = solve_profile(&request, &config).expect("solves");
    let t = solution.profile.temperature();

    assert_relative_eq!(t[4], 0.5 * (t[3] + t[5]));
    assert_eq!(solution.fallbacks[4], 1);
    assert_eq!(solution.fallbacks.iter().sum::<u32>(), 1);

    let mut counters = FallbackCounters::new(10);
    counters.record_nodes(&solution.fallbacks);
    assert!(counters.nodes[4].flag);
    assert_eq!(counters.nodes[4].count, 1);
    assert_eq!(counters.total(), 1);
}

#[test]
fn cold_nose_is_left_alone_without_fallback() {
    let column = column(10);
    let profile = cold_spike(&column);
    let config = config(Options {
        frozen_soil: false,
        fallback: false,
        ..Options::default()
    });

    let request = ProfileRequest::new(&column, &profile, 1.0, 3600.0).expect("valid request");
    let solution = solve_profile(&request, &config).expect("solves");
    let t = solution.profile.temperature();

    assert!(t[4] < 0.5 * (t[3] + t[5]) - 1.0);
    assert!(t[4] < t[3] && t[4] < t[5]);
    assert!(!solution.fell_back());
}

/// Explicit settings whose node search cannot bracket a frozen root.
fn blind_node_search(fallback: bool) -> Config {
    let mut options = Options {
        fallback,
        ..Options::default()
    };
    options.brackets.soil = 1e-3;
    options.root_finder.max_expansions = 0;
    config(options)
}

#[test]
fn failed_node_search_keeps_the_previous_temperature() {
    let column = column(10);
    let profile = uniform(&column, -2.0, 0.3);

    let request = ProfileRequest::new(&column, &profile, -10.0, 3600.0).expect("valid request");
    let solution = solve_profile(&request, &blind_node_search(true)).expect("falls back");

    assert_relative_eq!(solution.profile.temperature()[1], -2.0);
    assert!(solution.fallbacks[1] >= 1);
    assert_eq!(solution.fallbacks[0], 0);
    assert_eq!(solution.fallbacks[9], 0);
}

#[test]
fn failed_node_search_without_fallback_reports_the_node() {
    let column = column(10);
    let profile = uniform(&column, -2.0, 0.3);
    let config = blind_node_search(false);

    let request = ProfileRequest::new(&column, &profile, -10.0, 3600.0).expect("valid request");
    let error = solve_profile(&request, &config).expect_err("no sign change");

    let ThermalError::NodeUnconverged {
        diagnostics,
        source,
    } = error
    else {
        panic!("expected a node failure");
    };
    assert!(matches!(source, brent::Error::InvalidBracket(_)));

    let coefficients = NodeCoefficients::at(&column, &profile, 1, 3600.0, config.constants());
    let soil = column.node(1);
    assert_eq!(diagnostics.node, 1);
    assert_relative_eq!(diagnostics.t_upper, -10.0);
    assert_relative_eq!(diagnostics.t_lower, -2.0);
    assert_relative_eq!(diagnostics.t_previous, -2.0);
    assert_relative_eq!(diagnostics.moist, profile.moist()[1]);
    assert_relative_eq!(diagnostics.ice, profile.ice()[1]);
    assert_relative_eq!(diagnostics.max_moist, soil.max_moist);
    assert_relative_eq!(diagnostics.bubble, soil.bubble);
    assert_relative_eq!(diagnostics.expt, soil.expt);
    assert_relative_eq!(diagnostics.gamma, column.spacing(1).gamma);
    assert_relative_eq!(diagnostics.a, coefficients.a);
    assert_relative_eq!(diagnostics.e, coefficients.e);
    assert!(diagnostics.to_string().starts_with("node = 1\n"));
}

/// Implicit settings that cannot reach the solution in two short steps.
fn hobbled_newton(fallback: bool) -> Config {
    let mut options = Options {
        implicit: true,
        fallback,
        ..Options::default()
    };
    options.newton.max_iters = 2;
    options.newton.max_step = 0.01;
    config(options)
}

#[test]
fn failed_newton_keeps_every_unknown_node() {
    let column = column(10);
    let profile = uniform(&column, -0.5, 0.3);

    let request = ProfileRequest::new(&column, &profile, -15.0, 3600.0).expect("valid request");
    let solution = solve_profile(&request, &hobbled_newton(true)).expect("falls back");
    let t = solution.profile.temperature();

    assert_relative_eq!(t[0], -15.0);
    for &node in &t[1..] {
        assert_relative_eq!(node, -0.5);
    }
    assert!(solution.fallbacks[1..9].iter().all(|&events| events == 1));
    assert_eq!(solution.fallbacks[0], 0);
    assert_eq!(solution.fallbacks[9], 0);
}

#[test]
fn failed_newton_without_fallback_is_an_error() {
    let column = column(10);
    let profile = uniform(&column, -0.5, 0.3);

    let request = ProfileRequest::new(&column, &profile, -15.0, 3600.0).expect("valid request");
    let error = solve_profile(&request, &hobbled_newton(false)).expect_err("not converged");

    assert!(matches!(
        error,
        ThermalError::ProfileUnconverged(newton::Error::IterationLimit { iters: 2, .. })
    ));
}
