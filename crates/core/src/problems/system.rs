/// A system of residual equations whose size is known only at runtime.
///
/// Each unknown `x[i]` has a matching residual `r[i]`. Solvers drive every
/// residual toward zero. The soil thermal profile is the motivating case:
/// one heat-balance residual per interior node, with the node count fixed
/// when the column is built.
pub trait ResidualSystem {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the number of unknowns, which equals the number of residuals.
    fn len(&self) -> usize;

    /// Returns true if the system has no unknowns.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the residuals for the trial solution `x` into `residuals`.
    ///
    /// Both slices have length [`Self::len`].
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the residuals cannot be computed.
    fn residuals(&self, x: &[f64], residuals: &mut [f64]) -> Result<(), Self::Error>;
}
