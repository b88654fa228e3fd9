//! Soil thermal and surface energy balance physics for land-surface models.
//!
//! A grid cell is a [`column::SoilColumn`] of thermal nodes under a surface
//! that may carry snow. Each time step the caller builds immutable inputs
//! and gets a fresh state back:
//!
//! - [`surface::solve`] finds the surface temperature of bare or thinly
//!   snow-covered ground, solving the node profile at every trial.
//! - [`snowpack::solve`] does the same for a pack deep enough to be
//!   balanced on its own.
//! - [`node::solve_profile`] runs the conduction solve alone, with the
//!   explicit or implicit scheme.
//! - [`layers::reconcile`] averages node temperatures and ice back onto the
//!   hydrological soil layers.
//!
//! Solves that fail either fall back to the previous temperature, which is
//! counted in [`fallback::FallbackCounters`], or abort the cell with a
//! [`error::CellAborted`] carrying a [`diagnostics`] record.

pub mod column;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod fallback;
pub mod layers;
pub mod node;
pub mod profile;
pub mod properties;
pub mod snow;
pub mod snowpack;
pub mod surface;
pub mod vapor;

pub use column::{NodeLayout, SoilColumn, SoilLayer};
pub use config::Config;
pub use error::{AbortCause, CellAborted, ThermalError};
pub use fallback::FallbackCounters;
pub use profile::NodeProfile;
pub use snow::SnowState;
