//! core — data, forward model, penalties and state for dSTRF estimation.
//!
//! Purpose
//! -------
//! Collect the building blocks the fit loop composes: the temporal basis,
//! the regression data container, the normalized lead field and forward
//! model, sparsity penalties, the free-orientation covariance update, fit
//! options, the explicit fit state, and TRF output types.
//!
//! Key behaviors
//! -------------
//! - [`basis`] builds the Gaussian lag basis ([`gaussian_basis`]).
//! - [`data`] lag-embeds stimuli, aligns and normalizes sensor series, and
//!   caches sufficient statistics ([`RegData`]).
//! - [`lead_field`] normalizes the lead field and derives `eta` and the
//!   initial data covariance ([`LeadField`], [`ForwardModel`]).
//! - [`penalty`] provides L1 and group soft-thresholding ([`Penalty`]).
//! - [`gamma`] solves `γ·z·γ = x·xᵀ` behind a swappable eigen solver.
//! - [`state`] owns `theta` and per-trial covariances ([`FitState`]).
//!
//! Invariants & assumptions
//! ------------------------
//! - All arrays are finite `f64`; constructors reject non-finite input.
//! - Sensor series are `channels × time`; covariates are `time × features`
//!   with predictor-major feature blocks of `n_atoms` columns.
//! - Coefficients are `(sources·dc) × (predictors·n_atoms)` with rows
//!   ordered source-major (`row = source·dc + component`).
//!
//! Conventions
//! -----------
//! - Numerical failures inside this module surface as `None` from the
//!   linear-algebra helpers; the model layer attaches the trial key.
//! - No I/O and no logging.
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests for its hand-checkable behavior;
//!   end-to-end recovery lives in `tests/`.

pub mod basis;
pub mod covariates;
pub mod data;
pub mod gamma;
pub mod lead_field;
pub mod options;
pub mod penalty;
pub mod state;
pub mod trf;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::basis::{TemporalBasis, default_basis, gaussian_basis, linspace};
pub use self::covariates::Stimulus;
pub use self::data::{RegData, SufficientStatistics, Trial};
pub use self::gamma::{EigenBackend, SymmetricEigenSolver, compute_gamma};
pub use self::lead_field::{ForwardModel, LeadField, Orientation};
pub use self::options::{FitOptions, IterationBudget};
pub use self::penalty::{Penalty, group_penalty, l1_penalty, prox_group, shrink};
pub use self::state::{FitState, TrialCovariance};
pub use self::trf::{SourceGeometry, TimeAxis, Trf, TrfSet};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use dstrf::dstrf::core::prelude::*;
//
// to import the core surface in a single line.

pub mod prelude {
    pub use super::basis::{TemporalBasis, gaussian_basis};
    pub use super::covariates::Stimulus;
    pub use super::data::RegData;
    pub use super::lead_field::{ForwardModel, LeadField, Orientation};
    pub use super::options::{FitOptions, IterationBudget};
    pub use super::state::FitState;
    pub use super::trf::{SourceGeometry, TrfSet};
}
