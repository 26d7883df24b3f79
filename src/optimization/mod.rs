//! optimization — proximal-gradient solver, dense linear algebra, and a
//! unified error surface.
//!
//! Purpose
//! -------
//! Provide the numerical layer the estimator builds on: an Argmin-backed
//! FASTA solver for composite problems `min f(x) + g(x)` with smooth `f`
//! and proximable `g`, fallible Cholesky / eigen / SVD helpers bridged from
//! `ndarray` to `nalgebra`, and a single error type for both.
//!
//! Key behaviors
//! -------------
//! - [`proximal_gradient`] exposes [`SmoothObjective`] and
//!   [`ProximalOperator`] as the seams a model implements, plus
//!   [`minimize_composite`] as the one entry point.
//! - [`numerical_stability`] returns `None` instead of panicking on
//!   non-finite or indefinite input so callers can attach context.
//! - [`errors`] normalizes configuration mistakes, non-finite costs and
//!   backend failures into [`OptError`] / [`OptResult`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Coefficients are finite `f64` matrices; the solver validates the
//!   starting point, every gradient and the returned iterate.
//! - The solver minimizes; it knows nothing about the block structure of
//!   the coefficients, which only penalties interpret.
//!
//! Conventions
//! -----------
//! - No I/O. With the `obs_slog` feature and `FastaOptions::verbose`, the
//!   executor attaches a terminal slog observer.
//!
//! Downstream usage
//! ----------------
//! - Implement `SmoothObjective` for the data term and `ProximalOperator`
//!   for the penalty, then call `minimize_composite(&f, &g, theta0, &opts)`.
//!
//! Testing notes
//! -------------
//! - `proximal_gradient` is tested on least-squares and lasso problems with
//!   known solutions; `numerical_stability` on hand-checkable matrices.

pub mod errors;
pub mod numerical_stability;
pub mod proximal_gradient;

pub use self::errors::{OptError, OptResult};
pub use self::proximal_gradient::{
    FastaOptions, FastaOutcome, ProximalOperator, SmoothObjective, minimize_composite,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use dstrf::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::numerical_stability::prelude::*;
    pub use super::proximal_gradient::prelude::*;
}
