//! models — the dSTRF estimator, its inner solvers and diagnostics.
//!
//! Purpose
//! -------
//! Compose the `core` building blocks into an estimator: the whitened
//! least-squares objective handed to FASTA, the Champagne covariance
//! update, the outer alternation in [`DstRf`], model scores, and the ES-CV
//! sweep over sparsity weights.
//!
//! Key behaviors
//! -------------
//! - [`objective`] turns cached statistics and the current `Σ_b` into a
//!   [`SmoothObjective`](crate::optimization::proximal_gradient::traits::SmoothObjective).
//! - [`champagne`] re-estimates per-trial `Γ` and `Σ_b` with `theta` fixed.
//! - [`dstrf`] runs the alternation and exposes `fit`, `run_fit` and
//!   `get_strf`.
//! - [`diagnostics`] provides `eval_obj`, `eval_cv`, `eval_cv1` and
//!   [`compute_es_metric`].
//! - [`crossval`] provides contiguous k-fold splits and
//!   [`cross_validate`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Per-trial work runs on rayon and is reduced in trial order, so a fit
//!   is reproducible regardless of thread count.
//! - Numerical failures are fatal and carry the trial key and stage.
//!
//! Testing notes
//! -------------
//! - The objective is checked against explicit residuals and finite
//!   differences; Champagne against closed-form fixed points; the driver
//!   and diagnostics on small seeded problems. Recovery tests live in
//!   `tests/`.

pub mod champagne;
pub mod crossval;
pub mod diagnostics;
pub mod dstrf;
pub mod objective;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::crossval::{CvOptions, CvRecord, CvResult, Fold, cross_validate, kfold_indices};
pub use self::diagnostics::{compute_es_metric, eval_cv, eval_cv1, eval_obj};
pub use self::dstrf::{DstRf, FastaSummary, FitOutcome, relative_change};
pub use self::objective::TrfObjective;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use dstrf::dstrf::models::prelude::*;
//
// to import the estimator surface in a single line.

pub mod prelude {
    pub use super::{
        CvOptions, CvResult, DstRf, FitOutcome, compute_es_metric, cross_validate,
    };
}
