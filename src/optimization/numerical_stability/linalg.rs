//! linalg — dense factorizations bridged from `ndarray` into `nalgebra`.
//!
//! Purpose
//! -------
//! Give the estimation code a small, fallible vocabulary for the matrix
//! factorizations it needs (lower Cholesky factors, triangular solves,
//! spectral norms and symmetric eigendecompositions) while keeping every
//! public array in `ndarray` form.
//!
//! Key behaviors
//! -------------
//! - [`to_dmatrix`] / [`to_array2`] copy between `ndarray` and `nalgebra`
//!   storage without altering values.
//! - [`CholeskyFactor`] wraps the lower factor `L` of an SPD matrix and
//!   solves `L X = B` by forward substitution (never forming `L⁻¹`).
//! - [`symmetric_eigen_dense`] and [`symmetric_eigen_3x3`] return
//!   `(eigenvalues, eigenvectors)` with eigenvectors stored column-wise.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every routine returns `None` instead of panicking when its input is
//!   non-finite, not positive definite, or the iterative backend does not
//!   converge within [`EIGEN_MAX_ITER`] sweeps. Callers attach context
//!   (trial key, stage) when mapping `None` to an error.
//! - Symmetric routines read only the lower triangle of their input.
//!
//! Conventions
//! -----------
//! - Matrices are `f64`; eigenvalues are returned unsorted, in backend order.
//!
//! Testing notes
//! -------------
//! - Unit tests cover copy fidelity, `L Lᵀ = A` reconstruction, triangular
//!   solves against a hand-computed system, rejection of indefinite input,
//!   and agreement of the dense and fixed-size eigen paths.
use nalgebra::{Cholesky, DMatrix, Matrix3};
use ndarray::{Array1, Array2, ArrayView2};

/// Convergence threshold handed to `nalgebra`'s iterative eigen/SVD solvers.
pub const EIGEN_EPS: f64 = f64::EPSILON;

/// Maximum number of sweeps before an eigen/SVD solve is declared failed.
pub const EIGEN_MAX_ITER: usize = 1_000;

/// Copy an `ndarray` matrix into a freshly allocated `DMatrix`.
pub fn to_dmatrix(a: ArrayView2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

/// Copy a `DMatrix` back into row-major `ndarray` storage.
pub fn to_array2(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

fn all_finite(a: ArrayView2<f64>) -> bool {
    a.iter().all(|v| v.is_finite())
}

/// Lower Cholesky factor `L` of a symmetric positive-definite matrix `A = L Lᵀ`.
#[derive(Debug, Clone, PartialEq)]
pub struct CholeskyFactor {
    lower: DMatrix<f64>,
}

impl CholeskyFactor {
    /// Factor `a`; `None` if `a` is not square, not finite, or not positive definite.
    pub fn new(a: ArrayView2<f64>) -> Option<Self> {
        if a.nrows() != a.ncols() || !all_finite(a) {
            return None;
        }
        let chol = Cholesky::new(to_dmatrix(a))?;
        Some(Self { lower: chol.l() })
    }

    /// Dimension of the factored matrix.
    pub fn dim(&self) -> usize {
        self.lower.nrows()
    }

    /// The lower-triangular factor as an `ndarray` matrix.
    pub fn lower(&self) -> Array2<f64> {
        to_array2(&self.lower)
    }

    /// Solve `L X = B` for `X`.
    ///
    /// Returns `None` when `b` has the wrong number of rows or the factor has a
    /// zero on its diagonal.
    pub fn solve_lower(&self, b: ArrayView2<f64>) -> Option<Array2<f64>> {
        if b.nrows() != self.dim() {
            return None;
        }
        let x = self.lower.solve_lower_triangular(&to_dmatrix(b))?;
        Some(to_array2(&x))
    }

    /// `Σ log Lᵢᵢ`, i.e. half the log-determinant of `A`.
    pub fn log_diag_sum(&self) -> f64 {
        self.lower.diagonal().iter().map(|d| d.ln()).sum()
    }
}

/// Largest singular value of `a`.
pub fn spectral_norm(a: ArrayView2<f64>) -> Option<f64> {
    if !all_finite(a) {
        return None;
    }
    if a.is_empty() {
        return Some(0.0);
    }
    let svd = to_dmatrix(a).try_svd(false, false, EIGEN_EPS, EIGEN_MAX_ITER)?;
    Some(svd.singular_values.iter().cloned().fold(0.0_f64, f64::max))
}

/// Symmetric eigendecomposition for any square size.
pub fn symmetric_eigen_dense(a: ArrayView2<f64>) -> Option<(Array1<f64>, Array2<f64>)> {
    if a.nrows() != a.ncols() || !all_finite(a) {
        return None;
    }
    let eig = to_dmatrix(a).try_symmetric_eigen(EIGEN_EPS, EIGEN_MAX_ITER)?;
    let values = Array1::from_iter(eig.eigenvalues.iter().cloned());
    Some((values, to_array2(&eig.eigenvectors)))
}

/// Symmetric eigendecomposition on stack-allocated 3×3 storage.
///
/// Returns `None` for anything that is not exactly 3×3.
pub fn symmetric_eigen_3x3(a: ArrayView2<f64>) -> Option<(Array1<f64>, Array2<f64>)> {
    if a.dim() != (3, 3) || !all_finite(a) {
        return None;
    }
    let m = Matrix3::from_fn(|i, j| a[[i, j]]);
    let eig = m.try_symmetric_eigen(EIGEN_EPS, EIGEN_MAX_ITER)?;
    let values = Array1::from_iter(eig.eigenvalues.iter().cloned());
    let vectors = Array2::from_shape_fn((3, 3), |(i, j)| eig.eigenvectors[(i, j)]);
    Some((values, vectors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Copies between `ndarray` and `DMatrix`.
    // - Cholesky reconstruction, triangular solves and failure on indefinite
    //   input.
    // - Spectral norm on a diagonal matrix.
    // - Agreement of the dense and 3×3 eigen paths through `V diag(λ) Vᵀ`.
    // -------------------------------------------------------------------------

    fn reconstruct(values: &Array1<f64>, vectors: &Array2<f64>) -> Array2<f64> {
        let scaled = vectors * values;
        scaled.dot(&vectors.t())
    }

    #[test]
    // Purpose
    // -------
    // `to_dmatrix` followed by `to_array2` is the identity.
    //
    // Given
    // -----
    // - A non-square 2×3 matrix.
    //
    // Expect
    // ------
    // - Entry-wise equality after the round trip.
    fn dmatrix_copies_preserve_entries() {
        let a = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];

        let back = to_array2(&to_dmatrix(a.view()));

        assert_eq!(back, a);
    }

    #[test]
    // Purpose
    // -------
    // The factor reproduces the input and solves lower systems.
    //
    // Given
    // -----
    // - `A = [[4, 2], [2, 3]]` with `L = [[2, 0], [1, √2]]`.
    // - `B = [[2], [1 + √2]]`, whose solution of `L X = B` is `[[1], [1]]`.
    //
    // Expect
    // ------
    // - `L Lᵀ = A`, `X = [[1], [1]]`, and `log_diag_sum = ln 2 + ln √2`.
    fn cholesky_reconstructs_and_solves() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let chol = CholeskyFactor::new(a.view()).expect("SPD input");

        let l = chol.lower();
        let rebuilt = l.dot(&l.t());
        let b = array![[2.0], [1.0 + 2.0_f64.sqrt()]];
        let x = chol.solve_lower(b.view()).expect("solvable");

        for (r, e) in rebuilt.iter().zip(a.iter()) {
            assert_abs_diff_eq!(*r, *e, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(x[[0, 0]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[[1, 0]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            chol.log_diag_sum(),
            2.0_f64.ln() + 2.0_f64.sqrt().ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    // Purpose
    // -------
    // Indefinite and non-finite matrices are rejected instead of factored.
    //
    // Given
    // -----
    // - `[[1, 2], [2, 1]]` (eigenvalues 3 and -1) and a matrix holding NaN.
    //
    // Expect
    // ------
    // - `CholeskyFactor::new` returns `None` for both.
    fn cholesky_rejects_indefinite_and_nan() {
        let indefinite = array![[1.0, 2.0], [2.0, 1.0]];
        let nan = array![[1.0, f64::NAN], [f64::NAN, 1.0]];

        assert!(CholeskyFactor::new(indefinite.view()).is_none());
        assert!(CholeskyFactor::new(nan.view()).is_none());
    }

    #[test]
    // Purpose
    // -------
    // Spectral norm equals the largest absolute diagonal entry of a diagonal
    // matrix.
    //
    // Given
    // -----
    // - `diag(1, -3, 2)` padded with a zero column.
    //
    // Expect
    // ------
    // - Norm 3.
    fn spectral_norm_of_diagonal_matrix() {
        let a = array![[1.0, 0.0, 0.0, 0.0], [0.0, -3.0, 0.0, 0.0], [0.0, 0.0, 2.0, 0.0]];

        let norm = spectral_norm(a.view()).expect("finite input");

        assert_abs_diff_eq!(norm, 3.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Both eigen paths decompose the same symmetric 3×3 matrix.
    //
    // Given
    // -----
    // - A symmetric positive-definite 3×3 matrix.
    //
    // Expect
    // ------
    // - `V diag(λ) Vᵀ` reproduces the input for each path, and the sorted
    //   eigenvalues agree.
    fn dense_and_fixed_eigen_agree() {
        let a = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 2.0]];

        let (dv, dvec) = symmetric_eigen_dense(a.view()).expect("dense eigen");
        let (fv, fvec) = symmetric_eigen_3x3(a.view()).expect("fixed eigen");

        for (r, e) in reconstruct(&dv, &dvec).iter().zip(a.iter()) {
            assert_abs_diff_eq!(*r, *e, epsilon = 1e-10);
        }
        for (r, e) in reconstruct(&fv, &fvec).iter().zip(a.iter()) {
            assert_abs_diff_eq!(*r, *e, epsilon = 1e-10);
        }
        let mut ds = dv.to_vec();
        let mut fs = fv.to_vec();
        ds.sort_by(|a, b| a.total_cmp(b));
        fs.sort_by(|a, b| a.total_cmp(b));
        for (d, f) in ds.iter().zip(fs.iter()) {
            assert_abs_diff_eq!(*d, *f, epsilon = 1e-10);
        }
    }

    #[test]
    // Purpose
    // -------
    // The fixed-size path refuses anything that is not 3×3.
    //
    // Given
    // -----
    // - A 2×2 identity.
    //
    // Expect
    // ------
    // - `None`.
    fn fixed_eigen_rejects_wrong_size() {
        let a = array![[1.0, 0.0], [0.0, 1.0]];

        assert!(symmetric_eigen_3x3(a.view()).is_none());
    }
}
