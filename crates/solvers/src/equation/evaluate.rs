use thiserror::Error;

use tundra_core::{EquationProblem, Model, Snapshot};

/// One point of an equation problem: where it was evaluated, what the
/// model returned there, and the residuals it produced.
#[derive(Debug, Clone)]
pub struct Evaluation<I, O, const N: usize> {
    pub x: [f64; N],
    pub residuals: [f64; N],
    pub snapshot: Snapshot<I, O>,
}

impl<I, O> Evaluation<I, O, 1> {
    /// The residual of a scalar problem.
    #[must_use]
    pub fn residual(&self) -> f64 {
        self.residuals[0]
    }
}

/// Why a point could not be evaluated.
#[derive(Debug, Error)]
pub enum EvalError<ME, PE> {
    #[error("model call failed")]
    Model(#[source] ME),

    #[error("problem error")]
    Problem(#[source] PE),

    /// The model ran but a residual came back NaN or infinite.
    #[error("residual {index} is {residual} at x = {x:?}")]
    NonFinite {
        x: Vec<f64>,
        index: usize,
        residual: f64,
    },
}

/// Type alias for the result of [`evaluate`].
pub type EvaluateResult<M, P, const N: usize> = Result<
    Evaluation<<M as Model>::Input, <M as Model>::Output, N>,
    EvalError<<M as Model>::Error, <P as EquationProblem<N>>::Error>,
>;

/// Evaluates `problem` through `model` at `x`.
///
/// A point whose residuals are not all finite is an error, so solvers never
/// have to compare against NaN.
///
/// # Errors
///
/// Returns an error if building the input, the model call, or the residual
/// computation fails, or if a residual is not finite.
pub fn evaluate<M, P, const N: usize>(
    model: &M,
    problem: &P,
    x: [f64; N],
) -> EvaluateResult<M, P, N>
where
    M: Model,
    P: EquationProblem<N, Input = M::Input, Output = M::Output>,
{
    let input = problem.input(&x).map_err(EvalError::Problem)?;
    let output = model.call(&input).map_err(EvalError::Model)?;
    let residuals = problem
        .residuals(&input, &output)
        .map_err(EvalError::Problem)?;

    if let Some(index) = residuals.iter().position(|r| !r.is_finite()) {
        return Err(EvalError::NonFinite {
            x: x.to_vec(),
            index,
            residual: residuals[index],
        });
    }

    Ok(Evaluation {
        x,
        residuals,
        snapshot: Snapshot::new(input, output),
    })
}
