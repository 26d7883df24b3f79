//! dstrf — spatio-temporal response functions with Champagne source priors.
//!
//! Purpose
//! -------
//! Estimate, from multichannel sensor recordings and stimulus predictors,
//! a TRF for every source of a cortical grid. Coefficients live in the span
//! of a Gaussian lag basis and are fitted by alternating a FASTA
//! proximal-gradient solve (L1 or group sparsity) with a Champagne update
//! of per-trial source and data covariances.
//!
//! Key behaviors
//! -------------
//! - [`core`] holds data loading, the forward model, penalties, options,
//!   fit state and TRF output types.
//! - [`models`] holds the estimator [`DstRf`], its inner solvers,
//!   diagnostics and cross-validation.
//! - [`errors`] defines [`DstrfError`] and [`DstrfResult`].
//!
//! Downstream usage
//! ----------------
//! 1. Load trials into a [`RegData`] and build a [`LeadField`].
//! 2. Construct a [`DstRf`] with a noise covariance, a [`SourceGeometry`]
//!    and an [`IterationBudget`].
//! 3. Call `fit(&data, mu, &FitOptions::default())`, then `get_strf`.
//! 4. Optionally pick `mu` with [`cross_validate`].
//!
//! Conventions
//! -----------
//! - No I/O; verbose progress goes to stderr only with the `obs_slog`
//!   feature.

pub mod core;
pub mod errors;
pub mod models;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::{
    FitOptions, FitState, ForwardModel, IterationBudget, LeadField, Orientation, RegData,
    SourceGeometry, Stimulus, TemporalBasis, Trf, TrfSet, gaussian_basis,
};
pub use self::errors::{DstrfError, DstrfResult};
pub use self::models::{
    CvOptions, CvResult, DstRf, FitOutcome, compute_es_metric, cross_validate,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use dstrf::dstrf::prelude::*;
//
// to import the everyday surface in a single line.

pub mod prelude {
    pub use super::{
        CvOptions, CvResult, DstRf, DstrfError, DstrfResult, FitOptions, FitOutcome,
        IterationBudget, LeadField, Orientation, RegData, SourceGeometry, Stimulus, TrfSet,
        compute_es_metric, cross_validate, gaussian_basis,
    };
}
