use super::Error;

/// A square tridiagonal matrix stored by diagonals.
///
/// Row `i` holds `sub[i]` at column `i - 1`, `diag[i]` at column `i`, and
/// `sup[i]` at column `i + 1`. `sub[0]` and `sup[n - 1]` are unused.
#[derive(Debug, Clone)]
pub(super) struct Tridiagonal {
    sub: Vec<f64>,
    diag: Vec<f64>,
    sup: Vec<f64>,
}

impl Tridiagonal {
    pub(super) fn zeros(n: usize) -> Self {
        Self {
            sub: vec![0.0; n],
            diag: vec![0.0; n],
            sup: vec![0.0; n],
        }
    }

    /// Sets entry `(row, col)`; entries outside the band are ignored.
    pub(super) fn set(&mut self, row: usize, col: usize, value: f64) {
        if col == row {
            self.diag[row] = value;
        } else if col + 1 == row {
            self.sub[row] = value;
        } else if row + 1 == col {
            self.sup[row] = value;
        }
    }

    /// Solves `A · x = rhs`, overwriting `rhs` with `x`.
    ///
    /// Forward elimination followed by back substitution, without pivoting.
    /// The matrix itself is left untouched.
    pub(super) fn solve_in_place(&self, rhs: &mut [f64]) -> Result<(), Error> {
        let n = self.diag.len();
        if n == 0 {
            return Ok(());
        }

        let mut pivot = self.diag.clone();
        for i in 1..n {
            check_pivot(pivot[i - 1], i - 1)?;
            let w = self.sub[i] / pivot[i - 1];
            pivot[i] -= w * self.sup[i - 1];
            rhs[i] -= w * rhs[i - 1];
        }

        check_pivot(pivot[n - 1], n - 1)?;
        rhs[n - 1] /= pivot[n - 1];
        for i in (0..n - 1).rev() {
            rhs[i] = (rhs[i] - self.sup[i] * rhs[i + 1]) / pivot[i];
        }
        Ok(())
    }
}

fn check_pivot(value: f64, row: usize) -> Result<(), Error> {
    if value.is_finite() && value.abs() > f64::MIN_POSITIVE {
        Ok(())
    } else {
        Err(Error::SingularJacobian { row })
    }
}
