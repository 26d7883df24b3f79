//! Fit options — iteration budgets and per-fit configuration.
//!
//! Purpose
//! -------
//! Gather every knob of a dSTRF fit into two validated carriers so the
//! outer driver never checks ad-hoc arguments:
//! - [`IterationBudget`] is fixed at model construction (outer, Champagne
//!   and FASTA iteration counts).
//! - [`FitOptions`] is supplied per call to `fit` (tolerance, verbosity,
//!   time-index subset, Champagne override, eigen backend switch and the
//!   FASTA configuration).
//!
//! Invariants & assumptions
//! ------------------------
//! - Every iteration count is strictly positive.
//! - `tol` is finite and strictly positive.
//! - `idx`, when present, is non-empty; range checks against the data happen
//!   in `RegData::timeslice`.
//!
//! Conventions
//! -----------
//! - Defaults: `n_iter = 30`, `n_iterc = 10`, `n_iterf = 100`, `tol = 1e-4`,
//!   `use_accelerated = true`, FASTA defaults from [`FastaOptions`].
//! - `FitOptions::fasta.max_iter` is overwritten by `IterationBudget::n_iterf`
//!   when the fit runs; the model's budget is authoritative.
//!
//! Testing notes
//! -------------
//! - Unit tests check defaults and each validation failure.
use crate::{
    dstrf::errors::{DstrfError, DstrfResult},
    optimization::proximal_gradient::traits::FastaOptions,
};

fn verify_count(name: &'static str, value: usize) -> DstrfResult<()> {
    if value == 0 {
        return Err(DstrfError::InvalidIterationCount { name, value });
    }
    Ok(())
}

/// Iteration counts for the three nested loops of a fit.
///
/// Fields
/// ------
/// - `n_iter`: outer alternations between FASTA and Champagne.
/// - `n_iterc`: Champagne fixed-point sweeps per outer iteration.
/// - `n_iterf`: FASTA iterations per outer iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationBudget {
    pub n_iter: usize,
    pub n_iterc: usize,
    pub n_iterf: usize,
}

impl IterationBudget {
    /// Construct a validated budget.
    ///
    /// # Errors
    /// - `DstrfError::InvalidIterationCount` if any count is zero.
    pub fn new(n_iter: usize, n_iterc: usize, n_iterf: usize) -> DstrfResult<Self> {
        verify_count("n_iter", n_iter)?;
        verify_count("n_iterc", n_iterc)?;
        verify_count("n_iterf", n_iterf)?;
        Ok(Self { n_iter, n_iterc, n_iterf })
    }
}

impl Default for IterationBudget {
    fn default() -> Self {
        Self { n_iter: 30, n_iterc: 10, n_iterf: 100 }
    }
}

/// Per-call configuration of `DstRf::fit`.
///
/// Fields
/// ------
/// - `tol`: stop the outer loop once `‖Δθ‖_F / ‖θ‖_F < tol`.
/// - `verbose`: log the outer loop and attach the FASTA observer (only
///   effective with the `obs_slog` feature).
/// - `idx`: fit on this subset of time indices (see `RegData::timeslice`).
/// - `n_iterc`: override the model's Champagne sweep count for this call.
/// - `use_accelerated`: use the fixed-size 3×3 eigen solver.
/// - `fasta`: inner solver tolerances and backtracking settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    pub tol: f64,
    pub verbose: bool,
    pub idx: Option<Vec<usize>>,
    pub n_iterc: Option<usize>,
    pub use_accelerated: bool,
    pub fasta: FastaOptions,
}

impl FitOptions {
    /// Construct validated options.
    ///
    /// # Errors
    /// - `DstrfError::InvalidTolerance` for non-finite or non-positive `tol`.
    /// - `DstrfError::EmptyIndexSet` for `Some(vec![])`.
    /// - `DstrfError::InvalidIterationCount` for `n_iterc == Some(0)`.
    pub fn new(
        tol: f64, verbose: bool, idx: Option<Vec<usize>>, n_iterc: Option<usize>,
        use_accelerated: bool, fasta: FastaOptions,
    ) -> DstrfResult<Self> {
        let opts = Self { tol, verbose, idx, n_iterc, use_accelerated, fasta };
        opts.validate()?;
        Ok(opts)
    }

    /// Re-check the invariants; used by `fit` since fields are public.
    pub fn validate(&self) -> DstrfResult<()> {
        if !self.tol.is_finite() || self.tol <= 0.0 {
            return Err(DstrfError::InvalidTolerance { value: self.tol });
        }
        if matches!(&self.idx, Some(idx) if idx.is_empty()) {
            return Err(DstrfError::EmptyIndexSet);
        }
        if let Some(n) = self.n_iterc {
            verify_count("n_iterc", n)?;
        }
        Ok(())
    }
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            tol: 1e-4,
            verbose: false,
            idx: None,
            n_iterc: None,
            use_accelerated: true,
            fasta: FastaOptions::default(),
        }
    }
}
