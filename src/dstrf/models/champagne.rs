//! Champagne fixed-point update of source and data covariances.
//!
//! Purpose
//! -------
//! With `theta` held fixed, re-estimate per trial the source covariance
//! blocks `Γ_i` and the data covariance `Σ_b = noise + Σ_i L_i Γ_i L_iᵀ`
//! from the residual `y = meg − Lθ covᵀ`.
//!
//! Key behaviors
//! -------------
//! - `ŷ = chol(y·yᵀ)` is formed once per call; each sweep whitens `L` and
//!   `ŷ` by `chol(Σ_b)` through triangular solves and rebuilds `Σ_b` from
//!   the noise covariance.
//! - Per source, `x = Γ_i·L̃_iᵀ·ỹ` and `z = L̃_iᵀ·L̃_i`.
//!   - Fixed orientation: `Γ_i = ‖x‖/√z`, or 0 when `z ≤ 0`.
//!   - Free orientation: `Γ_i` solves `Γ·z·Γ = x·xᵀ` via
//!     [`compute_gamma`] with the selected eigen backend.
//! - The whitened residual factor `ỹ = chol(Σ_b)⁻¹·ŷ` is used for both
//!   orientations.
//! - Trials run in parallel; results are written back in trial order.
//!
//! Invariants & assumptions
//! ------------------------
//! - The sweep count is fixed; there is no inner convergence test.
//! - Any failed factorization aborts the whole update with the trial key.
use crate::dstrf::{
    core::{
        data::{RegData, Trial},
        gamma::{EigenBackend, compute_gamma},
        lead_field::{ForwardModel, Orientation},
        state::{FitState, TrialCovariance},
    },
    errors::{DstrfError, DstrfResult},
};
use crate::optimization::numerical_stability::linalg::CholeskyFactor;
use ndarray::{Array2, s};
use rayon::prelude::*;

/// Run `n_iterc` Champagne sweeps on every trial and store the result in
/// `state.covariances`.
///
/// # Errors
/// - `NotPositiveDefinite` for the residual covariance or `Σ_b`.
/// - `EigenDecompositionFailed` in the free-orientation update.
/// - `UnknownTrial` if `state` lacks a trial of `data`.
pub fn solve(
    forward: &ForwardModel, data: &RegData, state: &mut FitState, n_iterc: usize,
    backend: &EigenBackend,
) -> DstrfResult<()> {
    let snapshot: &FitState = state;
    let updated: Vec<DstrfResult<TrialCovariance>> = data
        .trials()
        .par_iter()
        .map(|trial| {
            let start = snapshot.covariance(&trial.key)?;
            solve_trial(forward, trial, &snapshot.theta, start, n_iterc, backend)
        })
        .collect();
    let updated = updated.into_iter().collect::<DstrfResult<Vec<_>>>()?;
    for (trial, cov) in data.trials().iter().zip(updated) {
        state.covariances.insert(trial.key.clone(), cov);
    }
    Ok(())
}

/// Champagne sweeps for a single trial.
pub fn solve_trial(
    forward: &ForwardModel, trial: &Trial, theta: &Array2<f64>, start: &TrialCovariance,
    n_iterc: usize, backend: &EigenBackend,
) -> DstrfResult<TrialCovariance> {
    let lf = forward.lead_field();
    let l = lf.matrix();
    let dc = lf.dc();
    let npd = |stage: &'static str| DstrfError::NotPositiveDefinite {
        trial: trial.key.clone(),
        stage,
    };

    let y = &trial.meg - &l.dot(theta).dot(&trial.covariates.t());
    let cb = y.dot(&y.t());
    let yhat = CholeskyFactor::new(cb.view()).ok_or_else(|| npd("residual covariance"))?.lower();

    let mut gamma = start.gamma.clone();
    let mut sigma_b = start.sigma_b.clone();
    for _ in 0..n_iterc {
        let lc = CholeskyFactor::new(sigma_b.view()).ok_or_else(|| npd("champagne sigma_b"))?;
        let lhat = lc.solve_lower(l.view()).ok_or_else(|| npd("champagne sigma_b"))?;
        let ytilde = lc.solve_lower(yhat.view()).ok_or_else(|| npd("champagne sigma_b"))?;

        sigma_b = forward.noise_cov().clone();
        for (i, g) in gamma.iter_mut().enumerate() {
            let lhat_i = lhat.slice(s![.., i * dc..(i + 1) * dc]);
            let x = g.dot(&lhat_i.t().dot(&ytilde));
            let z = lhat_i.t().dot(&lhat_i);
            let xxt = x.dot(&x.t());
            *g = match lf.orientation() {
                Orientation::Fixed => {
                    let z0 = z[[0, 0]];
                    let value = if z0 > 0.0 { xxt[[0, 0]].sqrt() / z0.sqrt() } else { 0.0 };
                    Array2::from_elem((1, 1), value)
                }
                Orientation::Free => compute_gamma(z.view(), xxt.view(), backend).ok_or_else(
                    || DstrfError::EigenDecompositionFailed {
                        trial: trial.key.clone(),
                        stage: "source covariance",
                    },
                )?,
            };
            let l_i = lf.block(i);
            sigma_b += &l_i.dot(&*g).dot(&l_i.t());
        }
    }
    Ok(TrialCovariance { gamma, sigma_b })
}
