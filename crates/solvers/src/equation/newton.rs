//! Newton–Raphson iteration for tridiagonal residual systems.
//!
//! # Algorithm
//!
//! Starting from an initial guess, each iteration evaluates the residual
//! vector `r(x)`, builds the Jacobian by forward-difference perturbation of
//! one unknown at a time, and solves `J · Δx = -r` for the update. Only the
//! three central diagonals of the Jacobian are kept, so the linear solve is a
//! single Thomas-algorithm sweep. Updates larger than `max_step` in any
//! component are scaled back uniformly.
//!
//! Iteration stops when the largest residual magnitude falls to
//! `residual_tol`, or when the largest update component falls to `step_tol`.
//!
//! # When to Use
//!
//! Use this solver for one-dimensional diffusion-like problems where residual
//! `i` depends only on unknowns `i - 1`, `i`, and `i + 1`, such as an implicit
//! heat-conduction step on a column of nodes. Entries outside the tridiagonal
//! band are ignored, which slows convergence if the system is not banded.
//!
//! # Errors
//!
//! The solver fails if a residual is not finite, if the Jacobian is singular,
//! if the system reports an error, or if the iteration budget runs out.

mod config;
mod error;
mod event;
mod solution;
mod thomas;


pub use config::{Config, ConfigError};
pub use error::Error;
pub use event::{Action, Event};
pub use solution::{Solution, Status};

use tundra_core::{Observer, ResidualSystem};

use thomas::Tridiagonal;

/// Solves `system` for the unknowns that zero every residual.
///
/// The observer sees the state at the start of every iteration.
///
/// # Errors
///
/// Returns an error if the config is invalid, the initial guess has the wrong
/// length, a residual is not finite, the Jacobian is singular, the system
/// fails, or `max_iters` is reached before convergence.
pub fn solve<S, Obs>(
    system: &S,
    initial: &[f64],
    config: &Config,
    mut observer: Obs,
) -> Result<Solution, Error>
where
    S: ResidualSystem,
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    config.validate()?;

    let n = system.len();
    if initial.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            found: initial.len(),
        });
    }

    let mut x = initial.to_vec();
    let mut residuals = vec![0.0; n];
    evaluate(system, &x, &mut residuals)?;

    if n == 0 {
        return Ok(Solution::new(Status::Converged, x, residuals, 0));
    }

    let mut jacobian = Tridiagonal::zeros(n);
    let mut perturbed = vec![0.0; n];
    let mut trial = vec![0.0; n];

    let mut iter = 0;
    loop {
        let max_residual = max_abs(&residuals);

        let event = Event {
            iter,
            x: &x,
            residuals: &residuals,
            max_residual,
        };
        if let Some(Action::StopEarly) = observer.observe(&event) {
            return Ok(Solution::new(Status::StoppedByObserver, x, residuals, iter));
        }

        if max_residual <= config.residual_tol() {
            return Ok(Solution::new(Status::Converged, x, residuals, iter));
        }
        if iter == config.max_iters() {
            return Err(Error::IterationLimit {
                iters: iter,
                max_residual,
            });
        }

        // Forward-difference Jacobian, one column at a time.
        for j in 0..n {
            let h = config.perturbation() * x[j].abs().max(1.0);
            trial.copy_from_slice(&x);
            trial[j] += h;
            evaluate(system, &trial, &mut perturbed)?;

            let lo = j.saturating_sub(1);
            let hi = (j + 1).min(n - 1);
            for i in lo..=hi {
                jacobian.set(i, j, (perturbed[i] - residuals[i]) / h);
            }
        }

        let mut step: Vec<f64> = residuals.iter().map(|r| -r).collect();
        jacobian.solve_in_place(&mut step)?;

        let largest = max_abs(&step);
        if largest > config.max_step() {
            let scale = config.max_step() / largest;
            step.iter_mut().for_each(|dx| *dx *= scale);
        }

        for (xi, dx) in x.iter_mut().zip(&step) {
            *xi += dx;
        }
        evaluate(system, &x, &mut residuals)?;

        iter += 1;

        if max_abs(&step) <= config.step_tol() {
            return Ok(Solution::new(Status::Converged, x, residuals, iter));
        }
    }
}

/// Runs Newton–Raphson without observation.
///
/// # Errors
///
/// See [`solve`].
pub fn solve_unobserved<S: ResidualSystem>(
    system: &S,
    initial: &[f64],
    config: &Config,
) -> Result<Solution, Error> {
    solve(system, initial, config, ())
}

/// Evaluates the residuals and rejects non-finite values.
fn evaluate<S: ResidualSystem>(system: &S, x: &[f64], residuals: &mut [f64]) -> Result<(), Error> {
    system
        .residuals(x, residuals)
        .map_err(|e| Error::System(Box::new(e)))?;

    match residuals.iter().position(|r| !r.is_finite()) {
        Some(index) => Err(Error::NonFiniteResidual {
            index,
            residual: residuals[index],
        }),
        None => Ok(()),
    }
}

fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc: f64, v| acc.max(v.abs()))
}
