use thiserror::Error;
use tundra_solvers::equation::{brent, newton};

use crate::{
    column::NodeVec,
    diagnostics::{Diagnostics, NodeDiagnostics},
    profile::ProfileError,
};

/// Errors raised by the soil node solvers.
#[derive(Debug, Error)]
pub enum ThermalError {
    /// The phase-change equation of one node had no solution in its bracket.
    #[error("node {} did not converge", .diagnostics.node)]
    NodeUnconverged {
        diagnostics: Box<NodeDiagnostics>,
        #[source]
        source: brent::Error,
    },

    /// Explicit sweeps did not settle.
    #[error("temperature profile did not settle after {sweeps} sweeps")]
    SweepLimit {
        sweeps: usize,
        /// Temperatures at the start of the step.
        previous: Box<NodeVec<f64>>,
        /// Temperatures after the last sweep.
        current: Box<NodeVec<f64>>,
    },

    /// Newton iteration on the implicit profile failed.
    #[error("implicit temperature profile did not converge")]
    ProfileUnconverged(#[source] newton::Error),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// What made a cell fail.
#[derive(Debug, Error)]
pub enum AbortCause {
    #[error("surface temperature search failed: {0}")]
    RootFinder(#[source] brent::Error),

    #[error(transparent)]
    Thermal(#[from] ThermalError),
}

/// A cell that cannot continue this time step.
///
/// Carries the inputs of the failed balance so the caller can report them.
#[derive(Debug, Error)]
#[error("cell aborted: {cause}")]
pub struct CellAborted {
    #[source]
    pub cause: AbortCause,
    pub diagnostics: Diagnostics,
}

impl CellAborted {
    pub(crate) fn new(cause: impl Into<AbortCause>, diagnostics: Diagnostics) -> Self {
        Self {
            cause: cause.into(),
            diagnostics,
        }
    }
}

impl From<brent::Error> for AbortCause {
    /// Model failures inside the search that came from a node solve are
    /// reported as thermal failures.
    fn from(error: brent::Error) -> Self {
        match error {
            brent::Error::Model(inner) => match inner.downcast::<ThermalError>() {
                Ok(thermal) => Self::Thermal(*thermal),
                Err(other) => Self::RootFinder(brent::Error::Model(other)),
            },
            other => Self::RootFinder(other),
        }
    }
}
