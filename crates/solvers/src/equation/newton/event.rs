/// Control actions supported by the Newton solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop and return the current iterate.
    StopEarly,
}

/// State at the start of a Newton iteration.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    /// Number of completed updates.
    pub iter: usize,

    /// Current iterate.
    pub x: &'a [f64],

    /// Residuals at the current iterate.
    pub residuals: &'a [f64],

    /// Largest residual magnitude.
    pub max_residual: f64,
}
