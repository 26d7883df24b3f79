//! Whitened least-squares objective over all trials.
//!
//! Purpose
//! -------
//! Build the smooth part of the TRF problem from cached sufficient
//! statistics so FASTA never touches the full time series. For each trial,
//! with `Lt = chol(Σ_b)`:
//!
//! ```text
//! L̃ = Lt⁻¹ L,   b̃E = Lt⁻¹ bE,   b̃b̃ = ‖Lt⁻¹ meg‖_F²
//! f(θ)  = Σ 0.5·(b̃b̃ − 2⟨b̃E, L̃θ⟩ + ⟨L̃θ, L̃θ·EtE⟩)
//! ∇f(θ) = −Σ L̃ᵀ (b̃E − L̃θ·EtE)
//! ```
//!
//! which is `0.5·Σ‖Lt⁻¹(meg − Lθ covᵀ)‖_F²` expanded.
//!
//! Key behaviors
//! -------------
//! - [`TrfObjective::assemble`] whitens every trial in parallel and keeps
//!   trial order, so sums are reduced in the same order on every run.
//! - `b̃b̃` uses `trace(Lt⁻¹ (Lt⁻¹ bbt)ᵀ)`, which only needs the cached
//!   `bbt`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `data` is precomputed and `state` has a covariance for every trial.
//!
//! Testing notes
//! -------------
//! - The value is compared to an explicit whitened residual on random
//!   2-trial, 2-source data, and the gradient to central differences.
use crate::{
    dstrf::{
        core::{data::RegData, lead_field::ForwardModel, state::FitState},
        errors::{DstrfError, DstrfResult},
    },
    optimization::{
        errors::OptResult,
        numerical_stability::linalg::CholeskyFactor,
        proximal_gradient::{
            traits::SmoothObjective,
            types::{Coefs, Cost},
        },
    },
};
use ndarray::Array2;
use rayon::prelude::*;

#[derive(Debug, Clone)]
struct WhitenedTrial<'a> {
    leadfield: Array2<f64>,
    be: Array2<f64>,
    bbt: f64,
    ete: &'a Array2<f64>,
}

impl WhitenedTrial<'_> {
    fn value(&self, theta: &Coefs) -> f64 {
        let lt = self.leadfield.dot(theta);
        let cross = (&self.be * &lt).sum();
        let quad = (&lt * &lt.dot(self.ete)).sum();
        0.5 * (self.bbt - 2.0 * cross + quad)
    }

    fn gradient(&self, theta: &Coefs) -> Array2<f64> {
        let lt = self.leadfield.dot(theta);
        let resid = &self.be - &lt.dot(self.ete);
        -self.leadfield.t().dot(&resid)
    }
}

/// Smooth objective for one FASTA solve.
#[derive(Debug, Clone)]
pub struct TrfObjective<'a> {
    trials: Vec<WhitenedTrial<'a>>,
    shape: (usize, usize),
}

impl<'a> TrfObjective<'a> {
    /// Whiten every trial with its current `Σ_b`.
    ///
    /// # Errors
    /// - `StatisticsNotComputed` if `data` is not precomputed.
    /// - `UnknownTrial` if `state` lacks a trial.
    /// - `NotPositiveDefinite { stage: "objective sigma_b" }` on Cholesky
    ///   failure.
    pub fn assemble(
        forward: &ForwardModel, data: &'a RegData, state: &FitState,
    ) -> DstrfResult<Self> {
        let lf = forward.lead_field().matrix();
        let whitened: Vec<DstrfResult<WhitenedTrial<'a>>> = data
            .trials()
            .par_iter()
            .map(|trial| {
                let stats = trial.stats().ok_or(DstrfError::StatisticsNotComputed)?;
                let cov = state.covariance(&trial.key)?;
                let failed = || DstrfError::NotPositiveDefinite {
                    trial: trial.key.clone(),
                    stage: "objective sigma_b",
                };
                let chol = CholeskyFactor::new(cov.sigma_b.view()).ok_or_else(failed)?;
                let leadfield = chol.solve_lower(lf.view()).ok_or_else(failed)?;
                let be = chol.solve_lower(stats.be.view()).ok_or_else(failed)?;
                let half = chol.solve_lower(stats.bbt.view()).ok_or_else(failed)?;
                let inner = chol.solve_lower(half.t()).ok_or_else(failed)?;
                let bbt = inner.diag().sum();
                Ok(WhitenedTrial { leadfield, be, bbt, ete: &stats.ete })
            })
            .collect();
        let trials = whitened.into_iter().collect::<DstrfResult<Vec<_>>>()?;
        let n_features = data.n_features().ok_or(DstrfError::NoTrials)?;
        Ok(Self { trials, shape: (lf.ncols(), n_features) })
    }

    pub fn n_trials(&self) -> usize {
        self.trials.len()
    }
}

impl SmoothObjective for TrfObjective<'_> {
    fn value(&self, x: &Coefs) -> OptResult<Cost> {
        let parts: Vec<f64> = self.trials.par_iter().map(|t| t.value(x)).collect();
        Ok(parts.iter().sum())
    }

    fn gradient(&self, x: &Coefs) -> OptResult<Coefs> {
        let parts: Vec<Array2<f64>> = self.trials.par_iter().map(|t| t.gradient(x)).collect();
        let mut total = Array2::zeros(self.shape);
        for g in &parts {
            total += g;
        }
        Ok(total)
    }

    fn shape(&self) -> (usize, usize) {
        self.shape
    }
}
