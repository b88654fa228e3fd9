/// Indicates how the solver finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Converged according to the configured tolerances.
    Converged,

    /// Stopped early due to an observer decision.
    StoppedByObserver,
}

/// The result of a Newton–Raphson solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Final solver status.
    pub status: Status,

    /// Final iterate.
    pub x: Vec<f64>,

    /// Residuals at the final iterate.
    pub residuals: Vec<f64>,

    /// Number of updates applied.
    pub iters: usize,
}

impl Solution {
    pub(super) fn new(status: Status, x: Vec<f64>, residuals: Vec<f64>, iters: usize) -> Self {
        Self {
            status,
            x,
            residuals,
            iters,
        }
    }

    /// Returns the largest residual magnitude.
    #[must_use]
    pub fn max_residual(&self) -> f64 {
        self.residuals.iter().fold(0.0, |acc: f64, r| acc.max(r.abs()))
    }
}
