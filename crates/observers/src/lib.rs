//! Reusable observers for the Tundra solvers.
//!
//! This crate provides [`Observer`] implementations and capability traits that
//! work across the solvers in [`tundra_solvers`].
//!
//! # Modules
//!
//! - [`traits`]: capability traits for cross-solver observers
//!   ([`HasResidual`], [`CanStopEarly`])
//! - [`record`]: observers that keep what they see ([`Recorder`],
//!   [`ResidualTrace`]) or stop a solve once it is close enough
//!   ([`GoodEnough`])
//!
//! [`Observer`]: tundra_core::Observer
//! [`HasResidual`]: traits::HasResidual
//! [`CanStopEarly`]: traits::CanStopEarly
//! [`Recorder`]: record::Recorder
//! [`ResidualTrace`]: record::ResidualTrace
//! [`GoodEnough`]: record::GoodEnough

pub mod record;
pub mod traits;
