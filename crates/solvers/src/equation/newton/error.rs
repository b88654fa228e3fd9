use std::error::Error as StdError;

use thiserror::Error;

use super::config::ConfigError;

/// Errors that can occur during Newton–Raphson solving.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("initial guess has {found} values, system has {expected} unknowns")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("residual {index} is not finite ({residual})")]
    NonFiniteResidual { index: usize, residual: f64 },

    #[error("jacobian is singular at row {row}")]
    SingularJacobian { row: usize },

    #[error("no convergence after {iters} iterations (max residual {max_residual})")]
    IterationLimit { iters: usize, max_residual: f64 },

    #[error("residual system failed")]
    System(#[source] Box<dyn StdError + Send + Sync>),
}
