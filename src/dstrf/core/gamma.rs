//! Source covariance update for free-orientation Champagne.
//!
//! Purpose
//! -------
//! Solve `γ·z·γ = x·xᵀ` for a symmetric PSD `γ` (3×3 per source), the
//! matrix geometric-mean step of the Champagne fixed point. The solution is
//!
//! ```text
//! z = V diag(e) Vᵀ,  M = diag(√e) Vᵀ xxᵀ V diag(√e) = U diag(d) Uᵀ
//! γ = W diag(√d) Wᵀ,  W = V diag(1/√e) U
//! ```
//!
//! with negative eigenvalues clamped to 0 and `1/0` taken as 0.
//!
//! Key behaviors
//! -------------
//! - Eigendecompositions go through [`SymmetricEigenSolver`], so the
//!   dense and fixed-size 3×3 backends are interchangeable.
//! - The result is symmetrized before it is returned.
//!
//! Testing notes
//! -------------
//! - Random PSD inputs from a seeded RNG check symmetry, PSD-ness, the
//!   defining equation, and agreement between backends.
use crate::optimization::numerical_stability::linalg::{
    symmetric_eigen_3x3, symmetric_eigen_dense,
};
use ndarray::{Array1, Array2, ArrayView2};

/// Symmetric eigendecomposition `a = V diag(λ) Vᵀ`, eigenvectors column-wise.
pub trait SymmetricEigenSolver {
    fn solve_symmetric_eig(&self, a: ArrayView2<f64>) -> Option<(Array1<f64>, Array2<f64>)>;
}

/// Available eigen backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EigenBackend {
    /// Heap-allocated solver for any size.
    Dense,
    /// Stack-allocated 3×3 solver; other sizes fall back to `Dense`.
    Fixed3,
}

impl EigenBackend {
    /// `Fixed3` when `accelerated`, `Dense` otherwise.
    pub fn select(accelerated: bool) -> Self {
        if accelerated { EigenBackend::Fixed3 } else { EigenBackend::Dense }
    }
}

impl SymmetricEigenSolver for EigenBackend {
    fn solve_symmetric_eig(&self, a: ArrayView2<f64>) -> Option<(Array1<f64>, Array2<f64>)> {
        match self {
            EigenBackend::Dense => symmetric_eigen_dense(a),
            EigenBackend::Fixed3 if a.dim() == (3, 3) => symmetric_eigen_3x3(a),
            EigenBackend::Fixed3 => symmetric_eigen_dense(a),
        }
    }
}

/// Solve `γ·z·γ = xxt` for symmetric PSD `γ`.
///
/// Returns `None` if either eigendecomposition fails.
pub fn compute_gamma<E: SymmetricEigenSolver>(
    z: ArrayView2<f64>, xxt: ArrayView2<f64>, solver: &E,
) -> Option<Array2<f64>> {
    let (e, v) = solver.solve_symmetric_eig(z)?;
    let sqrt_e = e.mapv(|x| x.max(0.0).sqrt());

    let temp = v.t().dot(&xxt).dot(&v);
    let n = sqrt_e.len();
    let m = Array2::from_shape_fn((n, n), |(i, j)| temp[[i, j]] * sqrt_e[i] * sqrt_e[j]);
    let (d, u) = solver.solve_symmetric_eig(m.view())?;
    let sqrt_d = d.mapv(|x| x.max(0.0).sqrt());

    let inv_sqrt_e = sqrt_e.mapv(|x| if x > 0.0 { 1.0 / x } else { 0.0 });
    let w = (&v * &inv_sqrt_e).dot(&u);
    let gamma = (&w * &sqrt_d).dot(&w.t());
    Some((&gamma + &gamma.t()) * 0.5)
}
