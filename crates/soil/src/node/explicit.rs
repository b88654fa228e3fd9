use std::convert::Infallible;

use tundra_core::{EquationProblem, Model};
use tundra_solvers::equation::brent;

use crate::{
    column::NodeVec,
    config::Config,
    constants::PhysicalConstants,
    diagnostics::NodeDiagnostics,
    error::ThermalError,
    properties::maximum_unfrozen_water,
};

use super::{
    NodeCoefficients, NodeSolution, ProfileRequest, finish, frozen_soil_active,
    initial_temperatures,
};

/// Phase-change equation of a single frozen node, as a Brent model.
struct NodeEquation<'a> {
    coefficients: NodeCoefficients,
    exponential: bool,
    t_previous: f64,
    t_lower: f64,
    t_upper: f64,
    moist: f64,
    max_moist: f64,
    bubble: f64,
    expt: f64,
    ice_previous: f64,
    constants: &'a PhysicalConstants,
}

impl Model for NodeEquation<'_> {
    type Input = f64;
    type Output = f64;
    type Error = Infallible;

    fn call(&self, t: &f64) -> Result<f64, Infallible> {
        let t = *t;
        let unfrozen =
            maximum_unfrozen_water(t, self.max_moist, self.bubble, self.expt, self.constants);
        let ice = (self.moist - unfrozen).max(0.0);
        Ok(self.coefficients.residual(
            self.exponential,
            t,
            self.t_previous,
            self.t_lower,
            self.t_upper,
            ice,
            self.ice_previous,
        ))
    }
}

impl EquationProblem<1> for NodeEquation<'_> {
    type Input = f64;
    type Output = f64;
    type Error = Infallible;

    fn input(&self, x: &[f64; 1]) -> Result<f64, Infallible> {
        Ok(x[0])
    }

    fn residuals(&self, _input: &f64, output: &f64) -> Result<[f64; 1], Infallible> {
        Ok([*output])
    }
}

pub(super) fn solve(
    request: &ProfileRequest<'_>,
    config: &Config,
) -> Result<NodeSolution, ThermalError> {
    let options = config.options();
    let constants = config.constants();
    let column = request.column();
    let previous = request.previous();
    let frozen = frozen_soil_active(column, config);
    let exponential = column.exp_scale().is_some();

    let n = request.nodes();
    let end = request.unknowns_end();
    let t0 = previous.temperature();

    let coefficients: NodeVec<NodeCoefficients> = (1..end)
        .map(|j| NodeCoefficients::at(column, previous, j, request.dt(), constants))
        .collect();

    let (mut t, mut fallbacks) = initial_temperatures(request);
    let start = t.clone();

    let mut sweeps = 0;
    let mut settled = false;
    while sweeps < options.explicit.max_sweeps {
        sweeps += 1;
        let mut max_change: f64 = 0.0;

        for j in 1..end {
            let old = t[j];
            let t_upper = t[j - 1];
            let t_lower = if j + 1 == n { t[j] } else { t[j + 1] };
            let coeffs = coefficients[j - 1];

            if t[j] >= 0.0 || !frozen {
                t[j] = coeffs.unfrozen(exponential, t0[j], t_lower, t_upper, previous.ice()[j]);
            } else {
                let soil = column.node(j);
                let equation = NodeEquation {
                    coefficients: coeffs,
                    exponential,
                    t_previous: t0[j],
                    t_lower,
                    t_upper,
                    moist: previous.moist()[j],
                    max_moist: soil.max_moist,
                    bubble: soil.bubble,
                    expt: soil.expt,
                    ice_previous: previous.ice()[j],
                    constants,
                };
                let half = options.brackets.soil;
                let bracket = [t0[j] - half, t0[j] + half];

                match brent::solve_unobserved(&equation, &equation, bracket, config.root_finder()) {
                    Ok(solution) => t[j] = solution.x,
                    Err(_) if options.fallback => {
                        t[j] = t0[j];
                        fallbacks[j] += 1;
                    }
                    Err(source) => {
                        let diagnostics = NodeDiagnostics {
                            node: j,
                            t_lower,
                            t_upper,
                            t_previous: t0[j],
                            moist: previous.moist()[j],
                            max_moist: soil.max_moist,
                            bubble: soil.bubble,
                            expt: soil.expt,
                            ice: previous.ice()[j],
                            gamma: column.spacing(j).gamma,
                            a: coeffs.a,
                            b: coeffs.b,
                            c: coeffs.c,
                            d: coeffs.d,
                            e: coeffs.e,
                        };
                        return Err(ThermalError::NodeUnconverged {
                            diagnostics: Box::new(diagnostics),
                            source,
                        });
                    }
                }
            }

            max_change = max_change.max((old - t[j]).abs());
        }

        if max_change <= options.explicit.threshold {
            settled = true;
            break;
        }
    }

    if options.fallback {
        smooth_cold_nose(&start, &mut t, &mut fallbacks, n);
    }

    if !settled {
        if !options.fallback {
            return Err(ThermalError::SweepLimit {
                sweeps,
                previous: Box::new(t0.iter().copied().collect()),
                current: Box::new(t),
            });
        }
        for j in 1..end {
            t[j] = t0[j];
            fallbacks[j] += 1;
        }
    }

    Ok(finish(request, config, &t, fallbacks, sweeps))
}

/// Replaces an isolated cold node whose gaps to both neighbours widened
/// during the step by the mean of its neighbours.
///
/// This is an empirical limiter, not a physical correction.
fn smooth_cold_nose(start: &[f64], t: &mut [f64], fallbacks: &mut [u32], n: usize) {
    for j in 1..n - 1 {
        if start[j - 1] - start[j] > 0.0
            && start[j + 1] - t[j] > 0.0
            && (t[j - 1] - t[j]) - (start[j - 1] - start[j]) > 0.0
            && (t[j + 1] - t[j]) - (start[j + 1] - start[j]) > 0.0
        {
            t[j] = 0.5 * (t[j - 1] + t[j + 1]);
            fallbacks[j] += 1;
        }
    }
}
