use crate::{column::SoilColumn, constants::PhysicalConstants, profile::NodeProfile};

/// Finite-difference coefficients of the explicit node equation.
///
/// With `T0` the previous temperature, `TU` and `TL` the node above and
/// below, and `ice0` the previous ice content, the equation at node `j` is
///
/// ```text
/// A(T0 - T) + B(TL - TU) + C(TL - T) + D(TU - T) + E(ice(T) - ice0) = 0
/// ```
///
/// on a linear grid, and
///
/// ```text
/// A(T0 - T) + B(TL - TU) + C(TL + TU - 2T) - D(TL - TU) + E(ice(T) - ice0) = 0
/// ```
///
/// on an exponential grid. Coefficients use conductivity and heat capacity
/// from the start of the step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeCoefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
}

impl NodeCoefficients {
    /// Coefficients at `node`.
    ///
    /// The bottom node of the column takes the mirrored spacing and a
    /// one-sided conductivity gradient; use it only with a zero-flux bottom.
    #[must_use]
    pub fn at(
        column: &SoilColumn,
        profile: &NodeProfile,
        node: usize,
        dt: f64,
        constants: &PhysicalConstants,
    ) -> Self {
        let kappa = profile.kappa();
        let cs = profile.heat_capacity()[node];
        let latent = constants.ice_density * constants.latent_heat_fusion;

        let dkappa = if node + 1 == column.node_count() {
            kappa[node] - kappa[node - 1]
        } else {
            kappa[node + 1] - kappa[node - 1]
        };

        match column.exp_scale() {
            None => {
                let s = column.spacing(node);
                let alpha2 = s.alpha * s.alpha;
                Self {
                    a: cs * alpha2,
                    b: dkappa * dt,
                    c: 2.0 * dt * kappa[node] * s.alpha / s.gamma,
                    d: 2.0 * dt * kappa[node] * s.alpha / s.beta,
                    e: latent * alpha2,
                }
            }
            Some(bexp) => {
                let z1 = column.depths()[node] + 1.0;
                let scale = 4.0 * bexp * bexp * z1 * z1;
                Self {
                    a: scale * cs,
                    b: dkappa * dt,
                    c: 4.0 * dt * kappa[node],
                    d: 2.0 * dt * kappa[node] * bexp,
                    e: scale * latent,
                }
            }
        }
    }

    /// Closed-form temperature of a node with no phase change.
    #[must_use]
    pub fn unfrozen(&self, exponential: bool, t0: f64, t_lower: f64, t_upper: f64, ice0: f64) -> f64 {
        let Self { a, b, c, d, e } = *self;
        if exponential {
            (a * t0 + b * (t_lower - t_upper) + c * (t_lower + t_upper) - d * (t_lower - t_upper)
                - e * ice0)
                / (a + 2.0 * c)
        } else {
            (a * t0 + b * (t_lower - t_upper) + c * t_lower + d * t_upper - e * ice0) / (a + c + d)
        }
    }

    /// Residual of the node equation at `t` with ice content `ice`.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn residual(
        &self,
        exponential: bool,
        t: f64,
        t0: f64,
        t_lower: f64,
        t_upper: f64,
        ice: f64,
        ice0: f64,
    ) -> f64 {
        let Self { a, b, c, d, e } = *self;
        let conduction = if exponential {
            c * (t_lower + t_upper - 2.0 * t) - d * (t_lower - t_upper)
        } else {
            c * (t_lower - t) + d * (t_upper - t)
        };
        a * (t0 - t) + b * (t_lower - t_upper) + conduction + e * (ice - ice0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::profile::tests::{column, uniform};

    #[test]
    fn unfrozen_update_zeroes_the_residual() {
        let column = column(10);
        let profile = uniform(&column, 3.0, 0.3);
        let c = PhysicalConstants::default();

        for exponential in [false, true] {
            let coeffs = NodeCoefficients::at(&column, &profile, 4, 3600.0, &c);
            let t = coeffs.unfrozen(exponential, 3.0, 1.0, 6.0, 0.0);
            let r = coeffs.residual(exponential, t, 3.0, 1.0, 6.0, 0.0, 0.0);
            assert_relative_eq!(r, 0.0, epsilon = 1e-6 * coeffs.a.abs());
        }
    }

    #[test]
    fn uniform_profile_is_steady() {
        let column = column(10);
        let profile = uniform(&column, 3.0, 0.3);
        let c = PhysicalConstants::default();
        let coeffs = NodeCoefficients::at(&column, &profile, 5, 3600.0, &c);

        assert_relative_eq!(coeffs.unfrozen(false, 3.0, 3.0, 3.0, 0.0), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn linear_coefficients_follow_spacing() {
        let column = column(10);
        let profile = uniform(&column, 3.0, 0.3);
        let c = PhysicalConstants::default();
        let coeffs = NodeCoefficients::at(&column, &profile, 3, 60.0, &c);
        let s = column.spacing(3);

        assert_relative_eq!(coeffs.a, profile.heat_capacity()[3] * s.alpha * s.alpha);
        assert_relative_eq!(coeffs.c, 2.0 * 60.0 * profile.kappa()[3] * s.alpha / s.gamma);
        assert_relative_eq!(coeffs.d, 2.0 * 60.0 * profile.kappa()[3] * s.alpha / s.beta);
    }
}
