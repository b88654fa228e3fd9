//! Observers that record solver progress or stop a solve early.

use tundra_core::Observer;

use crate::traits::{CanStopEarly, HasResidual};

/// Keeps a copy of every event it sees.
///
/// Works with events that own their data, such as the surface events of
/// `tundra-soil`. Solver events that borrow from the solver are better
/// summarized with [`ResidualTrace`].
#[derive(Debug, Clone, PartialEq)]
pub struct Recorder<E> {
    events: Vec<E>,
}

impl<E> Default for Recorder<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<E> Recorder<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[E] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<E> {
        self.events
    }
}

impl<E: Clone, A> Observer<E, A> for &mut Recorder<E> {
    fn observe(&mut self, event: &E) -> Option<A> {
        self.events.push(event.clone());
        None
    }
}

/// Records the residual of every event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResidualTrace {
    residuals: Vec<f64>,
}

impl ResidualTrace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Residual of the last event, if any.
    #[must_use]
    pub fn last(&self) -> Option<f64> {
        self.residuals.last().copied()
    }
}

impl<E: HasResidual, A> Observer<E, A> for &mut ResidualTrace {
    fn observe(&mut self, event: &E) -> Option<A> {
        self.residuals.push(event.residual());
        None
    }
}

/// Stops a solve once the residual is within `tolerance`, after at least
/// `min_events` events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoodEnough {
    tolerance: f64,
    min_events: usize,
    seen: usize,
}

impl GoodEnough {
    #[must_use]
    pub fn new(tolerance: f64, min_events: usize) -> Self {
        Self {
            tolerance,
            min_events,
            seen: 0,
        }
    }
}

impl<E: HasResidual, A: CanStopEarly> Observer<E, A> for GoodEnough {
    fn observe(&mut self, event: &E) -> Option<A> {
        self.seen += 1;
        if self.seen >= self.min_events && event.residual().abs() <= self.tolerance {
            return Some(A::stop_early());
        }
        None
    }
}
