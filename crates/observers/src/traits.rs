//! Capability traits for cross-solver observers.
//!
//! These traits abstract over solver-specific event and action types, enabling
//! observers to work generically across different solvers.
//!
//! # Example
//!
//! ```rust
//! use tundra_core::Observer;
//! use tundra_observers::traits::{CanStopEarly, HasResidual};
//!
//! struct FirstSmall {
//!     tolerance: f64,
//! }
//!
//! impl<E: HasResidual, A: CanStopEarly> Observer<E, A> for FirstSmall {
//!     fn observe(&mut self, event: &E) -> Option<A> {
//!         (event.residual().abs() < self.tolerance).then(A::stop_early)
//!     }
//! }
//! ```

use tundra_solvers::equation::{brent, newton};

/// An event that carries a residual value.
pub trait HasResidual {
    /// Returns the residual for this event.
    ///
    /// For systems of equations this is the largest residual magnitude.
    fn residual(&self) -> f64;
}

/// An action type that can signal early termination.
pub trait CanStopEarly {
    /// Returns the action that stops the solver early.
    fn stop_early() -> Self;
}

impl<I, O> HasResidual for brent::Event<'_, I, O> {
    fn residual(&self) -> f64 {
        self.eval.residual()
    }
}

impl HasResidual for newton::Event<'_> {
    fn residual(&self) -> f64 {
        self.max_residual
    }
}

impl CanStopEarly for brent::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}

impl CanStopEarly for newton::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}
