//! Numerical solvers for the Tundra crates.
//!
//! - [`equation::brent`]: bracketed scalar root finding
//! - [`equation::newton`]: Newton–Raphson for tridiagonal residual systems

pub mod equation;
