use thiserror::Error;

/// Configuration for the Brent solver.
///
/// The x tolerance at the current best estimate `b` is
/// `2 * x_rel_tol * |b| + 0.5 * x_abs_tol`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    max_iters: usize,
    x_abs_tol: f64,
    x_rel_tol: f64,
    residual_tol: f64,
    max_expansions: usize,
    expansion_step: f64,
}

/// Errors that can occur when validating a Brent solver config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("x_abs_tol must be finite and non-negative")]
    XAbs,

    #[error("x_rel_tol must be finite and non-negative")]
    XRel,

    #[error("residual_tol must be finite and non-negative")]
    Residual,

    #[error("expansion_step must be finite and positive")]
    ExpansionStep,
}

impl Default for Config {
    /// Defaults suited to temperature roots in degrees Celsius.
    ///
    /// Up to 1000 iterations, a 1e-7 absolute tolerance, a relative tolerance
    /// near machine precision, and up to five 10-degree bracket expansions.
    fn default() -> Self {
        Self {
            max_iters: 1000,
            x_abs_tol: 1e-7,
            x_rel_tol: 3e-16,
            residual_tol: 0.0,
            max_expansions: 5,
            expansion_step: 10.0,
        }
    }
}

impl Config {
    /// Creates a config with validated tolerances and no bracket expansion.
    ///
    /// # Errors
    ///
    /// Returns an error if any tolerance is negative or non-finite.
    pub fn new(max_iters: usize, x_abs_tol: f64, x_rel_tol: f64) -> Result<Self, ConfigError> {
        if !x_abs_tol.is_finite() || x_abs_tol < 0.0 {
            return Err(ConfigError::XAbs);
        }
        if !x_rel_tol.is_finite() || x_rel_tol < 0.0 {
            return Err(ConfigError::XRel);
        }

        Ok(Self {
            max_iters,
            x_abs_tol,
            x_rel_tol,
            residual_tol: 0.0,
            max_expansions: 0,
            expansion_step: 10.0,
        })
    }

    /// Returns a copy that also accepts any `|residual| <= residual_tol`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tolerance is negative or non-finite.
    pub fn with_residual_tol(self, residual_tol: f64) -> Result<Self, ConfigError> {
        if !residual_tol.is_finite() || residual_tol < 0.0 {
            return Err(ConfigError::Residual);
        }
        Ok(Self {
            residual_tol,
            ..self
        })
    }

    /// Returns a copy that widens a non-bracketing interval up to
    /// `max_expansions` times, moving each end outward by `step`.
    ///
    /// # Errors
    ///
    /// Returns an error if `step` is not finite and positive.
    pub fn with_expansion(self, max_expansions: usize, step: f64) -> Result<Self, ConfigError> {
        if !step.is_finite() || step <= 0.0 {
            return Err(ConfigError::ExpansionStep);
        }
        Ok(Self {
            max_expansions,
            expansion_step: step,
            ..self
        })
    }

    /// Re-checks every tolerance.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::new(self.max_iters, self.x_abs_tol, self.x_rel_tol)?
            .with_residual_tol(self.residual_tol)?
            .with_expansion(self.max_expansions, self.expansion_step)?;
        Ok(())
    }

    /// Returns the maximum number of Brent iterations.
    #[must_use]
    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    /// Returns the absolute tolerance for x convergence.
    #[must_use]
    pub fn x_abs_tol(&self) -> f64 {
        self.x_abs_tol
    }

    /// Returns the relative tolerance for x convergence.
    #[must_use]
    pub fn x_rel_tol(&self) -> f64 {
        self.x_rel_tol
    }

    /// Returns the residual tolerance.
    #[must_use]
    pub fn residual_tol(&self) -> f64 {
        self.residual_tol
    }

    /// Returns the maximum number of bracket expansions.
    #[must_use]
    pub fn max_expansions(&self) -> usize {
        self.max_expansions
    }

    /// Returns the distance each bracket end moves per expansion.
    #[must_use]
    pub fn expansion_step(&self) -> f64 {
        self.expansion_step
    }

    /// Returns the x tolerance at the estimate `b`.
    pub(super) fn x_tol_at(&self, b: f64) -> f64 {
        2.0 * self.x_rel_tol * b.abs() + 0.5 * self.x_abs_tol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_negative_tolerances() {
        assert_eq!(Config::new(10, -1.0, 0.0), Err(ConfigError::XAbs));
        assert_eq!(Config::new(10, 0.0, f64::NAN), Err(ConfigError::XRel));

        let config = Config::new(10, 1e-6, 0.0).expect("valid");
        assert_eq!(
            config.with_residual_tol(-1e-3),
            Err(ConfigError::Residual)
        );
        assert_eq!(
            config.with_expansion(3, 0.0),
            Err(ConfigError::ExpansionStep)
        );
    }

    #[test]
    fn new_disables_expansion() {
        let config = Config::new(25, 1e-6, 1e-12).expect("valid");
        assert_eq!(config.max_iters(), 25);
        assert_eq!(config.max_expansions(), 0);
    }
}
