//! Brent's method for bracketed scalar root finding.
//!
//! # Algorithm
//!
//! The solver keeps three points: `b`, the current best estimate; `c`, a point
//! whose residual has the opposite sign so the root lies between `b` and `c`;
//! and `a`, the previous value of `b`. Each iteration tries an interpolation
//! step (secant when only two distinct points are known, inverse quadratic
//! otherwise) and accepts it only when it lands well inside the bracket and
//! shrinks faster than bisection would. Otherwise it bisects. Convergence is
//! therefore never slower than bisection, and usually superlinear.
//!
//! If the supplied interval does not bracket a sign change, the solver can
//! widen it symmetrically a configured number of times before giving up
//! (see [`Config::with_expansion`]).
//!
//! # When to Use
//!
//! Use Brent when you can bracket the root and each evaluation is expensive,
//! as when every trial surface temperature requires a soil profile solve.
//!
//! # Errors
//!
//! The solver fails, rather than returning a partial answer, when the
//! interval cannot be made to bracket a root, when a residual is not finite,
//! when the model or problem fails, or when the iteration budget runs out.
//! Observers can end the search early with [`Action::StopEarly`].

mod bracket;
mod config;
mod error;
mod event;
mod solution;

#[cfg(test)]
mod tests;

pub use bracket::BracketError;
pub use config::{Config, ConfigError};
pub use error::Error;
pub use event::{Action, Event, Step};
pub use solution::{Solution, Status};

use tundra_core::{EquationProblem, Model, Observer};

use crate::equation::{Evaluation, evaluate};

/// Finds a root of a scalar equation problem within `bracket`.
///
/// Observers see every successful evaluation, including the initial bracket
/// ends and any expansions.
///
/// # Errors
///
/// Returns an error if the config or bracket is invalid, if no sign change
/// can be found, if a residual is not finite, if the model or problem fails,
/// or if `max_iters` is reached before convergence.
pub fn solve<M, P, Obs>(
    model: &M,
    problem: &P,
    bracket: [f64; 2],
    config: &Config,
    mut observer: Obs,
) -> Result<Solution<M::Input, M::Output>, Error>
where
    M: Model,
    P: EquationProblem<1, Input = M::Input, Output = M::Output>,
    Obs: for<'a> Observer<Event<'a, M::Input, M::Output>, Action>,
{
    config.validate()?;

    let (mut a, mut b) = bracket::ordered(bracket)?;
    let mut trials = Trials::new(model, problem);

    let (mut ia, mut fa) = trials.eval(a)?;
    if notify(&mut observer, 0, Step::Endpoint, [a, b], trials.get(ia)) {
        return Ok(trials.finish(ia, Status::StoppedByObserver, 0));
    }
    if fa.abs() <= config.residual_tol() {
        return Ok(trials.finish(ia, Status::Converged, 0));
    }

    let (mut ib, mut fb) = trials.eval(b)?;
    if notify(&mut observer, 0, Step::Endpoint, [a, b], trials.get(ib)) {
        return Ok(trials.finish_better(ia, ib, Status::StoppedByObserver, 0));
    }
    if fb.abs() <= config.residual_tol() {
        return Ok(trials.finish(ib, Status::Converged, 0));
    }

    let mut expansions = 0;
    while !bracket::straddles(fa, fb) {
        if expansions == config.max_expansions() {
            return Err(BracketError::NoSignChange {
                left: a,
                right: b,
                left_residual: fa,
                right_residual: fb,
                expansions,
            }
            .into());
        }
        expansions += 1;
        a -= config.expansion_step();
        b += config.expansion_step();

        (ia, fa) = trials.eval(a)?;
        if notify(&mut observer, 0, Step::Expansion, [a, b], trials.get(ia)) {
            return Ok(trials.finish(ia, Status::StoppedByObserver, 0));
        }
        if fa.abs() <= config.residual_tol() {
            return Ok(trials.finish(ia, Status::Converged, 0));
        }

        (ib, fb) = trials.eval(b)?;
        if notify(&mut observer, 0, Step::Expansion, [a, b], trials.get(ib)) {
            return Ok(trials.finish_better(ia, ib, Status::StoppedByObserver, 0));
        }
        if fb.abs() <= config.residual_tol() {
            return Ok(trials.finish(ib, Status::Converged, 0));
        }
    }

    let (mut c, mut fc, mut ic) = (b, fb, ib);
    let mut d = b - a;
    let mut e = d;

    for iter in 1..=config.max_iters() {
        if !bracket::straddles(fb, fc) {
            (c, fc, ic) = (a, fa, ia);
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            (a, fa, ia) = (b, fb, ib);
            (b, fb, ib) = (c, fc, ic);
            (c, fc, ic) = (a, fa, ia);
        }

        let tol = config.x_tol_at(b);
        let half = 0.5 * (c - b);
        if half.abs() <= tol || fb.abs() <= config.residual_tol() {
            return Ok(trials.finish(ib, Status::Converged, iter - 1));
        }

        let mut step = Step::Bisection;
        if e.abs() >= tol && fa.abs() > fb.abs() {
            let s = fb / fa;
            #[allow(clippy::float_cmp)]
            let (mut p, mut q) = if a == c {
                (2.0 * half * s, 1.0 - s)
            } else {
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * half * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();

            let limit = (3.0 * half * q - (tol * q).abs()).min((e * q).abs());
            if 2.0 * p < limit {
                e = d;
                d = p / q;
                step = Step::Interpolation;
            }
        }
        if step == Step::Bisection {
            d = half;
            e = d;
        }

        (a, fa, ia) = (b, fb, ib);
        b += if d.abs() > tol { d } else { tol.copysign(half) };
        (ib, fb) = trials.eval(b)?;

        let other = if bracket::straddles(fb, fc) { c } else { a };
        let span = [b.min(other), b.max(other)];
        if notify(&mut observer, iter, step, span, trials.get(ib)) {
            return Ok(trials.finish_better(ia, ib, Status::StoppedByObserver, iter));
        }
    }

    Err(Error::IterationLimit {
        iters: config.max_iters(),
        x: b,
        residual: fb,
    })
}

/// Runs Brent's method without observation.
///
/// # Errors
///
/// See [`solve`].
pub fn solve_unobserved<M, P>(
    model: &M,
    problem: &P,
    bracket: [f64; 2],
    config: &Config,
) -> Result<Solution<M::Input, M::Output>, Error>
where
    M: Model,
    P: EquationProblem<1, Input = M::Input, Output = M::Output>,
{
    solve(model, problem, bracket, config, ())
}

/// Sends an event to the observer and reports whether it asked to stop.
fn notify<I, O, Obs>(
    observer: &mut Obs,
    iter: usize,
    step: Step,
    bracket: [f64; 2],
    eval: &Evaluation<I, O, 1>,
) -> bool
where
    Obs: for<'a> Observer<Event<'a, I, O>, Action>,
{
    let event = Event {
        iter,
        step,
        bracket,
        eval,
    };
    matches!(observer.observe(&event), Some(Action::StopEarly))
}

/// Every evaluation made during a solve, addressed by index.
///
/// Brent shuffles the roles of its three points freely, so evaluations are
/// kept in one place and the points refer to them by index.
struct Trials<'p, M: Model, P> {
    model: &'p M,
    problem: &'p P,
    evals: Vec<Evaluation<M::Input, M::Output, 1>>,
}

impl<'p, M, P> Trials<'p, M, P>
where
    M: Model,
    P: EquationProblem<1, Input = M::Input, Output = M::Output>,
{
    fn new(model: &'p M, problem: &'p P) -> Self {
        Self {
            model,
            problem,
            evals: Vec::new(),
        }
    }

    /// Evaluates at `x`, returning the stored index and the residual.
    fn eval(&mut self, x: f64) -> Result<(usize, f64), Error> {
        let eval = evaluate(self.model, self.problem, [x])?;
        let residual = eval.residual();
        self.evals.push(eval);
        Ok((self.evals.len() - 1, residual))
    }

    fn get(&self, index: usize) -> &Evaluation<M::Input, M::Output, 1> {
        &self.evals[index]
    }

    fn finish(mut self, index: usize, status: Status, iters: usize) -> Solution<M::Input, M::Output> {
        Solution::from_eval(self.evals.swap_remove(index), status, iters)
    }

    /// Finishes with whichever of two evaluations has the smaller residual.
    fn finish_better(
        self,
        first: usize,
        second: usize,
        status: Status,
        iters: usize,
    ) -> Solution<M::Input, M::Output> {
        let first_residual = self.evals[first].residual().abs();
        let second_residual = self.evals[second].residual().abs();
        let index = if first_residual < second_residual {
            first
        } else {
            second
        };
        self.finish(index, status, iters)
    }
}
