//! Validation helpers for proximal-gradient optimization.
//!
//! - **Option checks**: [`verify_tol`], [`verify_max_iter`],
//!   [`verify_backtracking`] reject non-positive or non-finite settings.
//! - **Coefficient checks**: [`validate_initial_point`] and
//!   [`validate_theta_hat`] require finite matrices.
//! - **Gradient checks**: [`validate_grad`] enforces shape and finiteness.
//! - **Objective values**: [`validate_value`] checks finiteness.
use crate::optimization::{
    errors::{OptError, OptResult},
    proximal_gradient::types::Coefs,
};

/// Validate the relative-change tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidTol`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol(tol: f64) -> OptResult<()> {
    if !tol.is_finite() {
        return Err(OptError::InvalidTol { tol, reason: "Tolerance must be finite." });
    }
    if tol <= 0.0 {
        return Err(OptError::InvalidTol { tol, reason: "Tolerance must be positive." });
    }
    Ok(())
}

/// Validate an iteration budget.
///
/// # Errors
/// Returns [`OptError::InvalidMaxIter`] if `max_iter == 0`.
pub fn verify_max_iter(max_iter: usize) -> OptResult<()> {
    if max_iter == 0 {
        return Err(OptError::InvalidMaxIter {
            max_iter,
            reason: "Maximum iterations must be greater than zero.",
        });
    }
    Ok(())
}

/// Validate the backtracking factor and the backtracking budget.
///
/// # Errors
/// - [`OptError::InvalidBacktrackFactor`] unless `0 < factor < 1`.
/// - [`OptError::InvalidMaxBacktracks`] if `max_backtracks == 0`.
pub fn verify_backtracking(factor: f64, max_backtracks: usize) -> OptResult<()> {
    if !factor.is_finite() || factor <= 0.0 || factor >= 1.0 {
        return Err(OptError::InvalidBacktrackFactor {
            value: factor,
            reason: "Backtracking factor must lie strictly between 0 and 1.",
        });
    }
    if max_backtracks == 0 {
        return Err(OptError::InvalidMaxBacktracks {
            value: max_backtracks,
            reason: "At least one backtracking step must be allowed.",
        });
    }
    Ok(())
}

/// Validate a starting point.
///
/// # Errors
/// Returns [`OptError::InvalidInitialPoint`] for the first non-finite entry.
pub fn validate_initial_point(theta0: &Coefs) -> OptResult<()> {
    for ((row, col), &value) in theta0.indexed_iter() {
        if !value.is_finite() {
            return Err(OptError::InvalidInitialPoint { row, col, value });
        }
    }
    Ok(())
}

/// Validate a gradient matrix against the coefficient shape and finiteness.
///
/// # Errors
/// - [`OptError::GradientDimMismatch`] if shapes differ.
/// - [`OptError::InvalidGradient`] for the first non-finite entry.
pub fn validate_grad(grad: &Coefs, shape: (usize, usize)) -> OptResult<()> {
    if grad.dim() != shape {
        return Err(OptError::GradientDimMismatch { expected: shape, found: grad.dim() });
    }
    for ((row, col), &value) in grad.indexed_iter() {
        if !value.is_finite() {
            return Err(OptError::InvalidGradient {
                row,
                col,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

/// Validate that the solver produced finite coefficients.
///
/// # Errors
/// - [`OptError::MissingThetaHat`] if `theta_hat` is `None`.
/// - [`OptError::InvalidThetaHat`] for the first non-finite entry.
pub fn validate_theta_hat(theta_hat: Option<Coefs>) -> OptResult<Coefs> {
    let theta_hat = theta_hat.ok_or(OptError::MissingThetaHat)?;
    for ((row, col), &value) in theta_hat.indexed_iter() {
        if !value.is_finite() {
            return Err(OptError::InvalidThetaHat {
                row,
                col,
                value,
                reason: "Estimated coefficients must be finite.",
            });
        }
    }
    Ok(theta_hat)
}

/// Validate an objective value.
///
/// # Errors
/// Returns [`OptError::NonFiniteCost`] if `value` is `NaN` or infinite.
pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}
