//! Heat conduction with phase change through the soil nodes.
//!
//! Given the profile at the start of a step and a trial surface temperature,
//! [`solve_profile`] returns the node temperatures at the end of the step.
//! Two schemes are available:
//!
//! - **Explicit** sweeps update one node at a time from its neighbours until
//!   the profile settles. Unfrozen nodes have a closed-form update; frozen
//!   nodes solve their own phase-change equation with Brent's method.
//! - **Implicit** solves the whole profile at once with Newton–Raphson on
//!   [`ProfileResidual`], recomputing ice, conductivity, and heat capacity
//!   at every trial.
//!
//! Node 0 is the surface and always takes the trial temperature. The bottom
//! node is held at its previous temperature unless the column has a
//! zero-flux bottom, in which case it is solved too.
//!
//! When fallback is enabled, a node that cannot be solved keeps its previous
//! temperature and is counted in [`NodeSolution::fallbacks`]; otherwise the
//! failure is returned as a [`ThermalError`].

mod coefficients;
mod explicit;
mod implicit;
mod residual;

#[cfg(test)]
mod tests;

pub use coefficients::NodeCoefficients;
pub use residual::ProfileResidual;

use smallvec::smallvec;

use crate::{
    column::{NodeVec, SoilColumn},
    config::Config,
    error::ThermalError,
    profile::{NodeProfile, ProfileError},
};

/// A conduction solve for one trial surface temperature.
#[derive(Debug, Clone, Copy)]
pub struct ProfileRequest<'a> {
    column: &'a SoilColumn,
    previous: &'a NodeProfile,
    surface_temperature: f64,
    dt: f64,
    nodes: usize,
    no_flux: bool,
}

impl<'a> ProfileRequest<'a> {
    /// Solves every node of `column` with a fixed-temperature bottom.
    ///
    /// `dt` is the time step in seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if `previous` does not have one entry per node.
    pub fn new(
        column: &'a SoilColumn,
        previous: &'a NodeProfile,
        surface_temperature: f64,
        dt: f64,
    ) -> Result<Self, ProfileError> {
        if previous.len() != column.node_count() {
            return Err(ProfileError::LengthMismatch {
                field: "profile",
                expected: column.node_count(),
                found: previous.len(),
            });
        }
        Ok(Self {
            column,
            previous,
            surface_temperature,
            dt,
            nodes: column.node_count(),
            no_flux: false,
        })
    }

    /// Solves only the top `nodes` nodes, holding node `nodes - 1` fixed.
    ///
    /// The count is clamped to `3..=N`. A reduced column always has a
    /// fixed bottom.
    #[must_use]
    pub fn with_nodes(mut self, nodes: usize) -> Self {
        self.nodes = nodes.clamp(3, self.column.node_count());
        if self.nodes < self.column.node_count() {
            self.no_flux = false;
        }
        self
    }

    /// Uses a zero-flux bottom boundary on a full column.
    #[must_use]
    pub fn with_no_flux(mut self, no_flux: bool) -> Self {
        self.no_flux = no_flux && self.nodes == self.column.node_count();
        self
    }

    #[must_use]
    pub fn column(&self) -> &'a SoilColumn {
        self.column
    }

    #[must_use]
    pub fn previous(&self) -> &'a NodeProfile {
        self.previous
    }

    #[must_use]
    pub fn surface_temperature(&self) -> f64 {
        self.surface_temperature
    }

    #[must_use]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Number of nodes being solved, including the surface and bottom.
    #[must_use]
    pub fn nodes(&self) -> usize {
        self.nodes
    }

    #[must_use]
    pub fn no_flux(&self) -> bool {
        self.no_flux
    }

    /// Index one past the last solved node.
    fn unknowns_end(&self) -> usize {
        if self.no_flux {
            self.nodes
        } else {
            self.nodes - 1
        }
    }
}

/// Result of a conduction solve.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSolution {
    /// Profile at the end of the step. Nodes below the solved range keep
    /// their previous state.
    pub profile: NodeProfile,
    /// Fallback events per node during this solve. A node can be caught
    /// more than once, for example by a failed search and then by the
    /// cold-nose limiter.
    pub fallbacks: NodeVec<u32>,
    /// Sweeps (explicit) or Newton iterations (implicit) used.
    pub iterations: usize,
}

impl NodeSolution {
    /// Whether any node fell back.
    #[must_use]
    pub fn fell_back(&self) -> bool {
        self.fallbacks.iter().any(|&events| events > 0)
    }
}

/// Solves the node temperatures for `request` with the configured scheme.
///
/// # Errors
///
/// With fallback disabled, returns [`ThermalError::NodeUnconverged`] or
/// [`ThermalError::SweepLimit`] from the explicit scheme and
/// [`ThermalError::ProfileUnconverged`] from the implicit one.
pub fn solve_profile(
    request: &ProfileRequest<'_>,
    config: &Config,
) -> Result<NodeSolution, ThermalError> {
    if config.options().implicit {
        implicit::solve(request, config)
    } else {
        explicit::solve(request, config)
    }
}

/// Whether soil water may freeze in this column.
pub(crate) fn frozen_soil_active(column: &SoilColumn, config: &Config) -> bool {
    config.options().frozen_soil && column.frozen_soil()
}

/// Builds the output profile from solved temperatures.
fn finish(
    request: &ProfileRequest<'_>,
    config: &Config,
    temperature: &[f64],
    fallbacks: NodeVec<u32>,
    iterations: usize,
) -> NodeSolution {
    let profile = request.previous.with_temperatures(
        request.column,
        temperature,
        request.nodes,
        frozen_soil_active(request.column, config),
        config.constants(),
    );
    NodeSolution {
        profile,
        fallbacks,
        iterations,
    }
}

/// Starting temperatures: the previous profile with the trial surface.
fn initial_temperatures(request: &ProfileRequest<'_>) -> (NodeVec<f64>, NodeVec<u32>) {
    let mut temperature: NodeVec<f64> = request.previous.temperature().iter().copied().collect();
    temperature[0] = request.surface_temperature;
    (temperature, smallvec![0; request.previous.len()])
}
