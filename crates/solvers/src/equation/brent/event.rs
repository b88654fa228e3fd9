use crate::equation::Evaluation;

/// How the evaluated point was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// One of the two initial bracket ends.
    Endpoint,

    /// A bracket end after moving outward to find a sign change.
    Expansion,

    /// A secant or inverse quadratic interpolation step.
    Interpolation,

    /// A bisection step.
    Bisection,
}

/// Control actions supported by the Brent solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop and return the best evaluation seen so far.
    StopEarly,
}

/// Event emitted after every successful evaluation.
#[derive(Debug)]
pub struct Event<'a, I, O> {
    /// Iteration counter; zero while the bracket is being established.
    pub iter: usize,

    /// How the point was chosen.
    pub step: Step,

    /// Current interval known to contain the root, in `left < right` order.
    ///
    /// While the bracket is being established this is the trial interval.
    pub bracket: [f64; 2],

    /// The evaluation at the new point.
    pub eval: &'a Evaluation<I, O, 1>,
}

impl<I, O> Event<'_, I, O> {
    /// Returns the evaluated x.
    #[must_use]
    pub fn x(&self) -> f64 {
        self.eval.x[0]
    }

    /// Returns the residual at the evaluated x.
    #[must_use]
    pub fn residual(&self) -> f64 {
        self.eval.residual()
    }
}
