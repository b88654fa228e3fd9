use thiserror::Error;

/// Errors describing why an interval cannot be used as a bracket.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum BracketError {
    #[error("bracket bound is not finite: {value}")]
    NonFinite { value: f64 },

    #[error("bracket has zero width at {value}")]
    ZeroWidth { value: f64 },

    #[error(
        "no sign change on [{left}, {right}] after {expansions} expansions \
         (residuals {left_residual}, {right_residual})"
    )]
    NoSignChange {
        left: f64,
        right: f64,
        left_residual: f64,
        right_residual: f64,
        expansions: usize,
    },
}

/// Validates bracket values and returns them in `left < right` order.
pub(super) fn ordered(bracket: [f64; 2]) -> Result<(f64, f64), BracketError> {
    let [left, right] = bracket;

    if !left.is_finite() {
        return Err(BracketError::NonFinite { value: left });
    }
    if !right.is_finite() {
        return Err(BracketError::NonFinite { value: right });
    }

    #[allow(clippy::float_cmp)]
    if left == right {
        return Err(BracketError::ZeroWidth { value: left });
    }

    if left < right {
        Ok((left, right))
    } else {
        Ok((right, left))
    }
}

/// Returns true if `fa` and `fb` have strictly opposite signs.
pub(super) fn straddles(fa: f64, fb: f64) -> bool {
    (fa < 0.0 && fb > 0.0) || (fa > 0.0 && fb < 0.0)
}
