use std::convert::Infallible;

use tundra_core::ResidualSystem;

use crate::{
    column::{NodeVec, SoilColumn},
    constants::PhysicalConstants,
    profile::{NodeProfile, node_properties},
    properties::ice_content,
};

use super::ProfileRequest;

/// Node temperature gap at which a node colder than both neighbours is
/// prevented from cooling further by the conductivity gradient (°C).
const COLD_NOSE_GAP: f64 = 5.0;

/// Heat balance residuals of the implicit profile equation.
///
/// Unknowns are the temperatures of nodes `1..N-1`, plus node `N-1` with
/// a zero-flux bottom. For each unknown node the residual is
///
/// ```text
/// flux1 + flux2 + phase - storage
/// ```
///
/// where `flux1` carries the conductivity gradient, `flux2` the curvature of
/// the profile, `phase` the latent heat of new ice, and `storage` the change
/// in sensible heat including the change of heat capacity with ice. Ice,
/// conductivity, and heat capacity are recomputed from each trial
/// temperature. Units are W/m³.
///
/// A node more than 5 °C colder than both neighbours whose gradient term
/// outweighs and opposes the curvature term has the gradient term dropped,
/// so it cannot run away colder than either neighbour.
#[derive(Debug, Clone, Copy)]
pub struct ProfileResidual<'a> {
    column: &'a SoilColumn,
    previous: &'a NodeProfile,
    surface: f64,
    nodes: usize,
    no_flux: bool,
    dt: f64,
    frozen_soil: bool,
    constants: &'a PhysicalConstants,
}

impl<'a> ProfileResidual<'a> {
    #[must_use]
    pub fn new(
        request: &ProfileRequest<'a>,
        frozen_soil: bool,
        constants: &'a PhysicalConstants,
    ) -> Self {
        Self {
            column: request.column(),
            previous: request.previous(),
            surface: request.surface_temperature(),
            nodes: request.nodes(),
            no_flux: request.no_flux(),
            dt: request.dt(),
            frozen_soil,
            constants,
        }
    }

    /// Previous temperatures of the unknown nodes, the Newton starting point.
    #[must_use]
    pub fn initial(&self) -> NodeVec<f64> {
        self.previous.temperature()[1..=self.len()]
            .iter()
            .copied()
            .collect()
    }

    /// Temperature of node `k` given the unknowns `x`.
    fn temperature(&self, x: &[f64], k: usize) -> f64 {
        if k == 0 {
            self.surface
        } else if k <= x.len() {
            x[k - 1]
        } else {
            self.previous.temperature()[k]
        }
    }
}

impl ResidualSystem for ProfileResidual<'_> {
    type Error = Infallible;

    fn len(&self) -> usize {
        if self.no_flux {
            self.nodes - 1
        } else {
            self.nodes - 2
        }
    }

    fn residuals(&self, x: &[f64], residuals: &mut [f64]) -> Result<(), Infallible> {
        let prev = self.previous;
        let n = self.nodes;
        let m = x.len();
        let depths = self.column.depths();
        let latent = self.constants.ice_density * self.constants.latent_heat_fusion;

        let mut ice_new: NodeVec<f64> = prev.ice()[..n].iter().copied().collect();
        let mut kappa_new: NodeVec<f64> = prev.kappa()[..n].iter().copied().collect();
        let mut cs_new: NodeVec<f64> = prev.heat_capacity()[..n].iter().copied().collect();

        for (i, &t) in x.iter().enumerate() {
            let k = i + 1;
            let soil = self.column.node(k);
            let ice = ice_content(
                t,
                prev.moist()[k],
                soil.max_moist,
                soil.bubble,
                soil.expt,
                self.frozen_soil,
                self.constants,
            );
            ice_new[k] = ice;
            #[allow(clippy::float_cmp)]
            if ice != prev.ice()[k] {
                (kappa_new[k], cs_new[k]) = node_properties(self.column, k, prev.moist()[k], ice);
            }
        }

        for (i, residual) in residuals.iter_mut().enumerate().take(m) {
            let k = i + 1;
            let t = x[i];
            let bottom = self.no_flux && k == n - 1;

            let t_up = self.temperature(x, k - 1);
            let t_down = if bottom { t } else { self.temperature(x, k + 1) };
            let dt_span = t_down - t_up;
            let dt_up = t - t_up;
            let dt_down = t_down - t;

            let dkappa = if bottom {
                kappa_new[k] - kappa_new[k - 1]
            } else {
                kappa_new[k + 1] - kappa_new[k - 1]
            };

            let storage = cs_new[k] * (t - prev.temperature()[k]) / self.dt
                + t * (cs_new[k] - prev.heat_capacity()[k]) / self.dt;

            let (mut flux1, flux2) = match self.column.exp_scale() {
                None => {
                    let s = self.column.spacing(k);
                    (
                        dkappa / s.alpha * dt_span / s.alpha,
                        kappa_new[k] * (dt_down / s.gamma - dt_up / s.beta) / (0.5 * s.alpha),
                    )
                }
                Some(bexp) => {
                    let z1 = depths[k] + 1.0;
                    let g = bexp * z1;
                    (
                        dkappa / 2.0 * dt_span / 2.0 / g / g,
                        kappa_new[k]
                            * ((dt_down - dt_up) / g / g - dt_span / 2.0 / (bexp * z1 * z1)),
                    )
                }
            };

            if dt_span.abs() > COLD_NOSE_GAP
                && t < t_down
                && t < t_up
                && flux1 < 0.0
                && flux2 > 0.0
                && flux1.abs() > flux2.abs()
            {
                flux1 = 0.0;
            }

            let phase = latent * (ice_new[k] - prev.ice()[k]) / self.dt;
            *residual = flux1 + flux2 + phase - storage;
        }

        Ok(())
    }
}
