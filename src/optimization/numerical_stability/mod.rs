//! numerical_stability — fallible dense factorizations shared by the estimator.
//!
//! Purpose
//! -------
//! Centralize the linear algebra that must never panic inside a fit:
//! Cholesky factors of covariance matrices, triangular solves used for
//! whitening, spectral norms, and symmetric eigendecompositions. The rest
//! of the crate speaks `ndarray`; this module is where `nalgebra` enters.
//!
//! Key behaviors
//! -------------
//! - [`linalg::CholeskyFactor`] factors SPD matrices and whitens by forward
//!   substitution.
//! - [`linalg::spectral_norm`] scales lead fields.
//! - [`linalg::symmetric_eigen_dense`] / [`linalg::symmetric_eigen_3x3`]
//!   back the per-source covariance update.
//!
//! Invariants & assumptions
//! ------------------------
//! - Failures are reported as `None`; the caller owns the error context.
//!
//! Downstream usage
//! ----------------
//! - `dstrf::core` and `dstrf::models` import through
//!   `numerical_stability::prelude::*` or the `linalg` path directly.
pub mod linalg;

pub mod prelude {
    pub use super::linalg::{
        CholeskyFactor, EIGEN_EPS, EIGEN_MAX_ITER, spectral_norm, symmetric_eigen_3x3,
        symmetric_eigen_dense, to_array2, to_dmatrix,
    };
}
