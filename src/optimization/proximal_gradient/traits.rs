//! Public API surface for composite (smooth + non-smooth) minimization.
//!
//! - [`SmoothObjective`]: the differentiable part `f(x)`.
//! - [`ProximalOperator`]: the non-smooth part `g(x)` and its proximal map.
//! - [`FastaOptions`]: configuration for the FASTA solver.
//! - [`FastaOutcome`]: normalized result returned by `minimize_composite`.
//!
//! Convention: we *minimize* `F(x) = f(x) + g(x)`. The proximal map with step
//! `tau` is `prox_g(v, tau) = argmin_x g(x) + ‖x − v‖² / (2·tau)`.
use crate::optimization::{
    errors::OptResult,
    proximal_gradient::{
        types::{Coefs, Cost, FnEvalMap},
        validation::{
            validate_theta_hat, validate_value, verify_backtracking, verify_max_iter, verify_tol,
        },
    },
};
use argmin::core::{TerminationReason, TerminationStatus};

/// Differentiable part of a composite objective.
///
/// Required:
/// - `value(&Coefs) -> OptResult<Cost>`: evaluate `f(x)`.
/// - `gradient(&Coefs) -> OptResult<Coefs>`: evaluate `∇f(x)`, same shape as `x`.
/// - `shape()`: the coefficient shape the objective expects.
pub trait SmoothObjective: Sync {
    fn value(&self, x: &Coefs) -> OptResult<Cost>;
    fn gradient(&self, x: &Coefs) -> OptResult<Coefs>;
    fn shape(&self) -> (usize, usize);
}

/// Non-smooth part of a composite objective.
///
/// - `penalty(x)` returns `g(x)`.
/// - `prox(v, tau)` returns `argmin_x g(x) + ‖x − v‖²/(2 tau)`. It must not
///   alias `v` and must return a matrix of the same shape.
pub trait ProximalOperator: Sync {
    fn penalty(&self, x: &Coefs) -> f64;
    fn prox(&self, v: &Coefs, tau: f64) -> Coefs;
}

/// FASTA configuration.
///
/// Fields:
/// - `max_iter` — iteration budget for one solve.
/// - `tol` — stop when `‖x_{k+1} − x_k‖_F / max(‖x_{k+1}‖_F, ‖x_k‖_F) < tol`.
/// - `backtrack_factor` — step-size shrink factor in `(0, 1)`.
/// - `max_backtracks` — cap on shrink steps per iteration.
/// - `verbose` — attach the slog observer (behind the `obs_slog` feature).
///
/// Default: `max_iter = 100`, `tol = 1e-8`, `backtrack_factor = 0.5`,
/// `max_backtracks = 30`, `verbose = false`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FastaOptions {
    pub max_iter: usize,
    pub tol: f64,
    pub backtrack_factor: f64,
    pub max_backtracks: usize,
    pub verbose: bool,
}

impl FastaOptions {
    /// Construct validated options.
    ///
    /// # Errors
    /// - `OptError::InvalidMaxIter` if `max_iter == 0`.
    /// - `OptError::InvalidTol` for non-finite or non-positive `tol`.
    /// - `OptError::InvalidBacktrackFactor` / `OptError::InvalidMaxBacktracks`
    ///   for bad backtracking settings.
    pub fn new(
        max_iter: usize, tol: f64, backtrack_factor: f64, max_backtracks: usize, verbose: bool,
    ) -> OptResult<Self> {
        verify_max_iter(max_iter)?;
        verify_tol(tol)?;
        verify_backtracking(backtrack_factor, max_backtracks)?;
        Ok(Self { max_iter, tol, backtrack_factor, max_backtracks, verbose })
    }

    /// Copy of these options with a different iteration budget.
    pub fn with_max_iter(self, max_iter: usize) -> OptResult<Self> {
        verify_max_iter(max_iter)?;
        Ok(Self { max_iter, ..self })
    }
}

impl Default for FastaOptions {
    fn default() -> Self {
        Self { max_iter: 100, tol: 1e-8, backtrack_factor: 0.5, max_backtracks: 30, verbose: false }
    }
}

/// Canonical result returned by `minimize_composite`.
///
/// - `theta_hat`: best coefficients found (lowest composite value).
/// - `value`: composite value `f(θ̂) + g(θ̂)`.
/// - `converged`: `true` only when the relative-change criterion fired;
///   exhausting `max_iter` is reported through `status`.
/// - `status`: human-readable termination status string.
/// - `iterations`: number of solver iterations performed.
/// - `fn_evals`: evaluation counters reported by `argmin`.
#[derive(Debug, Clone, PartialEq)]
pub struct FastaOutcome {
    pub theta_hat: Coefs,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
}

impl FastaOutcome {
    /// Build a validated [`FastaOutcome`] from raw solver state.
    ///
    /// # Errors
    /// - Propagates validation errors for `theta_hat` or `value`.
    pub fn new(
        theta_hat_opt: Option<Coefs>, value: f64, termination: TerminationStatus,
        iterations: u64, fn_evals: FnEvalMap,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let (converged, status) = match termination {
            TerminationStatus::NotTerminated => (false, "Not terminated".to_string()),
            TerminationStatus::Terminated(reason) => {
                (matches!(reason, TerminationReason::SolverConverged), format!("{reason:?}"))
            }
        };
        Ok(Self { theta_hat, value, converged, status, iterations: iterations as usize, fn_evals })
    }
}
