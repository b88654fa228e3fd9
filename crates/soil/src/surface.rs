//! Surface energy balance of bare or thinly snow-covered ground.
//!
//! [`solve`] finds the surface temperature that closes the balance between
//! radiation, turbulent exchange, and conduction into the soil, then
//! updates the node profile, the layer averages, and any thin snowpack
//! solved together with the ground.

mod driver;
mod equation;
mod event;
mod inputs;

pub use driver::{SurfaceSolution, solve, solve_observed};
pub use equation::{GroundState, SurfaceEnergyBalance, SurfaceFluxes, SurfaceResidual, SurfaceTrial};
pub use event::{Stage, SurfaceEvent};
pub use inputs::{Aerodynamics, Forcing, SurfaceInputs};

#[cfg(test)]
mod tests;
