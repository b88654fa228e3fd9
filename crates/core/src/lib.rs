//! Core traits and types shared by the Tundra crates.
//!
//! Solvers, observers, and the physical models build on a small set of
//! abstractions:
//!
//! - [`Model`]: a callable that maps a typed input to a typed output
//! - [`Snapshot`]: a captured input/output pair from a model call
//! - [`Observer`]: receives solver events and optionally returns control actions
//! - [`EquationProblem`]: adapts scalar or fixed-size solver variables to a
//!   model and extracts residuals
//! - [`ResidualSystem`]: a variable-length system of residual equations,
//!   such as one equation per soil thermal node

mod model;
mod observer;
mod problems;

pub use model::{Model, Snapshot};
pub use observer::Observer;
pub use problems::{EquationProblem, ResidualSystem};
