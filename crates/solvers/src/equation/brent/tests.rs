use std::convert::Infallible;

use approx::assert_relative_eq;
use thiserror::Error;

use tundra_core::{EquationProblem, Model};

use super::{Action, BracketError, Config, Error, Event, Status, Step, solve, solve_unobserved};

/// f(x) = x³ - 2x - 5, with a single real root near 2.0946.
struct Cubic;

impl Model for Cubic {
    type Input = f64;
    type Output = f64;
    type Error = Infallible;

    fn call(&self, x: &f64) -> Result<f64, Self::Error> {
        Ok(x.powi(3) - 2.0 * x - 5.0)
    }
}

/// Uses the model output directly as the residual.
struct OutputIsResidual;

impl EquationProblem<1> for OutputIsResidual {
    type Input = f64;
    type Output = f64;
    type Error = Infallible;

    fn input(&self, x: &[f64; 1]) -> Result<f64, Self::Error> {
        Ok(x[0])
    }

    fn residuals(&self, _input: &f64, output: &f64) -> Result<[f64; 1], Self::Error> {
        Ok([*output])
    }
}

const CUBIC_ROOT: f64 = 2.094_551_481_542_326_5;

#[test]
fn finds_cubic_root() {
    let solution = solve_unobserved(&Cubic, &OutputIsResidual, [2.0, 3.0], &Config::default())
        .expect("should converge");

    assert_eq!(solution.status, Status::Converged);
    assert_relative_eq!(solution.x, CUBIC_ROOT, epsilon = 1e-7);
    assert_relative_eq!(solution.snapshot.input, solution.x);
}

#[test]
fn converges_faster_than_bisection() {
    let solution = solve_unobserved(&Cubic, &OutputIsResidual, [0.0, 10.0], &Config::default())
        .expect("should converge");

    // Bisection needs about 27 halvings to reach 1e-7 on a width-10 interval.
    assert!(solution.iters < 20, "took {} iterations", solution.iters);
    assert_relative_eq!(solution.x, CUBIC_ROOT, epsilon = 1e-7);
}

#[test]
fn reversed_bracket_is_accepted() {
    let solution = solve_unobserved(&Cubic, &OutputIsResidual, [3.0, 2.0], &Config::default())
        .expect("should converge");
    assert_relative_eq!(solution.x, CUBIC_ROOT, epsilon = 1e-7);
}

#[test]
fn exact_zero_at_endpoint_converges_immediately() {
    struct Shifted;

    impl Model for Shifted {
        type Input = f64;
        type Output = f64;
        type Error = Infallible;

        fn call(&self, x: &f64) -> Result<f64, Self::Error> {
            Ok(*x)
        }
    }

    let solution = solve_unobserved(&Shifted, &OutputIsResidual, [-1.0, 0.0], &Config::default())
        .expect("zero residual at right end");

    assert_eq!(solution.status, Status::Converged);
    assert_eq!(solution.iters, 0);
    assert_relative_eq!(solution.x, 0.0);
}

#[test]
fn same_sign_bracket_fails_without_expansion() {
    let config = Config::new(100, 1e-7, 0.0).expect("valid");
    let error = solve_unobserved(&Cubic, &OutputIsResidual, [3.0, 4.0], &config)
        .expect_err("no sign change");

    assert!(matches!(
        error,
        Error::InvalidBracket(BracketError::NoSignChange { expansions: 0, .. })
    ));
}

#[test]
fn expansion_recovers_a_missed_bracket() {
    let config = Config::new(100, 1e-7, 0.0)
        .and_then(|c| c.with_expansion(5, 1.0))
        .expect("valid");

    let mut steps = Vec::new();
    let observer = |event: &Event<'_, f64, f64>| -> Option<Action> {
        steps.push(event.step);
        None
    };

    let solution =
        solve(&Cubic, &OutputIsResidual, [3.0, 4.0], &config, observer).expect("should converge");

    assert_relative_eq!(solution.x, CUBIC_ROOT, epsilon = 1e-7);
    assert_eq!(&steps[..4], &[
        Step::Endpoint,
        Step::Endpoint,
        Step::Expansion,
        Step::Expansion
    ]);
}

#[test]
fn expansion_gives_up_after_limit() {
    struct AlwaysPositive;

    impl Model for AlwaysPositive {
        type Input = f64;
        type Output = f64;
        type Error = Infallible;

        fn call(&self, x: &f64) -> Result<f64, Self::Error> {
            Ok(1.0 + x * x)
        }
    }

    let config = Config::default();
    let error = solve_unobserved(&AlwaysPositive, &OutputIsResidual, [-1.0, 1.0], &config)
        .expect_err("no root exists");

    match error {
        Error::InvalidBracket(BracketError::NoSignChange {
            left,
            right,
            expansions,
            ..
        }) => {
            assert_eq!(expansions, 5);
            assert_relative_eq!(left, -51.0);
            assert_relative_eq!(right, 51.0);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn iteration_limit_is_an_error() {
    let config = Config::new(2, 1e-12, 0.0).expect("valid");
    let error = solve_unobserved(&Cubic, &OutputIsResidual, [0.0, 10.0], &config)
        .expect_err("too few iterations");

    assert!(matches!(error, Error::IterationLimit { iters: 2, .. }));
}

#[test]
fn observer_can_stop_early() {
    let mut seen = 0;
    let observer = |event: &Event<'_, f64, f64>| -> Option<Action> {
        seen += 1;
        (event.iter >= 2).then_some(Action::StopEarly)
    };

    let solution = solve(&Cubic, &OutputIsResidual, [0.0, 10.0], &Config::default(), observer)
        .expect("stopped early");

    assert_eq!(solution.status, Status::StoppedByObserver);
    assert_eq!(solution.iters, 2);
    assert_eq!(seen, 4);
}

#[test]
fn observer_brackets_always_contain_root() {
    let observer = |event: &Event<'_, f64, f64>| -> Option<Action> {
        if event.iter > 0 {
            let [left, right] = event.bracket;
            assert!(left <= CUBIC_ROOT && CUBIC_ROOT <= right);
        }
        None
    };

    solve(&Cubic, &OutputIsResidual, [-4.0, 7.0], &Config::default(), observer)
        .expect("should converge");
}

#[derive(Debug, Error)]
#[error("model exploded")]
struct Explode;

#[test]
fn model_errors_propagate() {
    struct Fails;

    impl Model for Fails {
        type Input = f64;
        type Output = f64;
        type Error = Explode;

        fn call(&self, _x: &f64) -> Result<f64, Self::Error> {
            Err(Explode)
        }
    }

    let error = solve_unobserved(&Fails, &OutputIsResidual, [0.0, 1.0], &Config::default())
        .expect_err("model fails");
    assert!(matches!(error, Error::Model(_)));
}

#[test]
fn non_finite_residual_is_rejected() {
    struct Singular;

    impl Model for Singular {
        type Input = f64;
        type Output = f64;
        type Error = Infallible;

        fn call(&self, x: &f64) -> Result<f64, Self::Error> {
            Ok(1.0 / x)
        }
    }

    let error = solve_unobserved(&Singular, &OutputIsResidual, [0.0, 1.0], &Config::default())
        .expect_err("infinite residual");
    assert!(matches!(error, Error::NonFiniteResidual { .. }));
}
