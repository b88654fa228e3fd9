//! Solvers for equation problems: driving residuals to zero.
//!
//! An [`EquationProblem`] maps solver variables `x: [f64; N]` to model inputs,
//! calls the model, and computes residuals. A [`ResidualSystem`] does the same
//! for a runtime-sized vector of unknowns.
//!
//! # Solvers
//!
//! - [`brent`]: guaranteed convergence on a bracketed interval, with
//!   interpolation steps for speed
//! - [`newton`]: quadratic convergence for tridiagonal systems from a good
//!   initial guess
//!
//! [`EquationProblem`]: tundra_core::EquationProblem
//! [`ResidualSystem`]: tundra_core::ResidualSystem

mod evaluate;

pub use evaluate::{EvalError, EvaluateResult, Evaluation, evaluate};

pub mod brent;
pub mod newton;
