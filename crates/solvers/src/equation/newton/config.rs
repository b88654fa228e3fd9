use thiserror::Error;

/// Configuration for the Newton–Raphson solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    max_iters: usize,
    residual_tol: f64,
    step_tol: f64,
    perturbation: f64,
    max_step: f64,
}

/// Errors that can occur when validating a Newton solver config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("residual_tol must be finite and non-negative")]
    Residual,

    #[error("step_tol must be finite and non-negative")]
    Step,

    #[error("perturbation must be finite and positive")]
    Perturbation,

    #[error("max_step must be positive")]
    MaxStep,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_iters: 50,
            residual_tol: 1e-6,
            step_tol: 1e-8,
            perturbation: 1e-6,
            max_step: f64::INFINITY,
        }
    }
}

impl Config {
    /// Creates a new config with validated tolerances and no step limit.
    ///
    /// # Errors
    ///
    /// Returns an error if a tolerance is negative or non-finite, or if the
    /// perturbation is not positive.
    pub fn new(
        max_iters: usize,
        residual_tol: f64,
        step_tol: f64,
        perturbation: f64,
    ) -> Result<Self, ConfigError> {
        if !residual_tol.is_finite() || residual_tol < 0.0 {
            return Err(ConfigError::Residual);
        }
        if !step_tol.is_finite() || step_tol < 0.0 {
            return Err(ConfigError::Step);
        }
        if !perturbation.is_finite() || perturbation <= 0.0 {
            return Err(ConfigError::Perturbation);
        }

        Ok(Self {
            max_iters,
            residual_tol,
            step_tol,
            perturbation,
            max_step: f64::INFINITY,
        })
    }

    /// Returns a copy that limits every update component to `max_step`.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_step` is not positive.
    pub fn with_max_step(self, max_step: f64) -> Result<Self, ConfigError> {
        if max_step.is_nan() || max_step <= 0.0 {
            return Err(ConfigError::MaxStep);
        }
        Ok(Self { max_step, ..self })
    }

    /// Re-checks every setting.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::new(
            self.max_iters,
            self.residual_tol,
            self.step_tol,
            self.perturbation,
        )?
        .with_max_step(self.max_step)?;
        Ok(())
    }

    /// Returns the maximum number of Newton iterations.
    #[must_use]
    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    /// Returns the residual tolerance.
    #[must_use]
    pub fn residual_tol(&self) -> f64 {
        self.residual_tol
    }

    /// Returns the update-size tolerance.
    #[must_use]
    pub fn step_tol(&self) -> f64 {
        self.step_tol
    }

    /// Returns the relative perturbation used for Jacobian columns.
    #[must_use]
    pub fn perturbation(&self) -> f64 {
        self.perturbation
    }

    /// Returns the largest allowed update component.
    #[must_use]
    pub fn max_step(&self) -> f64 {
        self.max_step
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
    fn rejects_bad_settings() {
        assert_eq!(Config::new(10, -1.0, 0.0, 1e-6), Err(ConfigError::Residual));
        assert_eq!(Config::new(10, 0.0, f64::NAN, 1e-6), Err(ConfigError::Step));
        assert_eq!(Config::new(10, 0.0, 0.0, 0.0), Err(ConfigError::Perturbation));

        let config = Config::new(10, 0.0, 0.0, 1e-6).expect("valid");
        assert_eq!(config.with_max_step(0.0), Err(ConfigError::MaxStep));
    }
}
