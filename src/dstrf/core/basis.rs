//! Temporal basis — Gaussian bumps spanning the TRF lag window.
//!
//! Purpose
//! -------
//! Reduce the lag dimension of a TRF from `filter_length` samples to a
//! handful of smooth atoms. Every TRF estimated by this crate lives in the
//! span of these atoms: `trf = theta · basisᵀ`.
//!
//! Key behaviors
//! -------------
//! - [`gaussian_basis`] places `nlevel − 1` Gaussian atoms of fixed width
//!   [`BASIS_WIDTH`] at evenly spaced centers between `span_max/nlevel` and
//!   `span_max·(1 − 1/nlevel)`, evaluates them on the lag grid `span`, and
//!   divides the matrix by its maximum.
//! - [`linspace`] mirrors the usual closed-interval grid, returning `[start]`
//!   for a single point.
//!
//! Invariants & assumptions
//! ------------------------
//! - `nlevel ≥ 2`; a single level has no interior center.
//! - The span is non-empty and finite. It is usually increasing, but only
//!   its last value is used to place the centers.
//!
//! Testing notes
//! -------------
//! - `nlevel = 2` yields one symmetric bump with peak 1 at `span_max/2`.
//! - Shapes and the unit maximum are checked on the default grid.
use crate::dstrf::errors::{DstrfError, DstrfResult};
use ndarray::{Array1, Array2, ArrayView1};

/// Standard deviation of every atom, in lag-grid units.
pub const BASIS_WIDTH: f64 = 8.5;

/// `num` evenly spaced points over the closed interval `[start, stop]`.
pub fn linspace(start: f64, stop: f64, num: usize) -> Array1<f64> {
    match num {
        0 => Array1::zeros(0),
        1 => Array1::from_elem(1, start),
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            Array1::from_shape_fn(num, |i| start + step * i as f64)
        }
    }
}

/// Lag-domain basis: `filter_length × n_atoms`, maximum entry 1.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalBasis {
    matrix: Array2<f64>,
}

impl TemporalBasis {
    /// Number of lag bins (rows).
    pub fn filter_length(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of atoms (columns).
    pub fn n_atoms(&self) -> usize {
        self.matrix.ncols()
    }

    /// The basis matrix.
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }
}

/// Build a Gaussian temporal basis.
///
/// Parameters
/// ----------
/// - `nlevel`: number of levels; produces `nlevel − 1` atoms.
/// - `span`: lag values at which atoms are evaluated (length `filter_length`).
///
/// Returns
/// -------
/// A [`TemporalBasis`] of shape `span.len() × (nlevel − 1)`.
///
/// Errors
/// ------
/// - `DstrfError::BasisTooSmall` if `nlevel < 2`.
/// - `DstrfError::InvalidSpan` if `span` is empty, non-finite, or every atom
///   evaluates to zero on it.
pub fn gaussian_basis(nlevel: usize, span: ArrayView1<f64>) -> DstrfResult<TemporalBasis> {
    if nlevel < 2 {
        return Err(DstrfError::BasisTooSmall { nlevel });
    }
    let span_max = match span.last() {
        Some(&v) => v,
        None => return Err(DstrfError::InvalidSpan { reason: "span is empty" }),
    };
    if span.iter().any(|v| !v.is_finite()) {
        return Err(DstrfError::InvalidSpan { reason: "span contains non-finite values" });
    }

    let n = nlevel as f64;
    let centers = linspace(span_max / n, span_max * (1.0 - 1.0 / n), nlevel - 1);
    let denom = 2.0 * BASIS_WIDTH * BASIS_WIDTH;
    let mut matrix = Array2::from_shape_fn((span.len(), centers.len()), |(i, k)| {
        let d = span[i] - centers[k];
        (-d * d / denom).exp()
    });

    let peak = matrix.iter().cloned().fold(0.0_f64, f64::max);
    if peak <= 0.0 {
        return Err(DstrfError::InvalidSpan { reason: "no atom overlaps the span" });
    }
    matrix.mapv_inplace(|v| v / peak);
    Ok(TemporalBasis { matrix })
}

/// Default basis for a filter length: `nlevel = filter_length` atoms on
/// `linspace(5, 1000, filter_length)`.
pub fn default_basis(filter_length: usize) -> DstrfResult<TemporalBasis> {
    if filter_length == 0 {
        return Err(DstrfError::InvalidFilterLength { filter_length });
    }
    let span = linspace(5.0, 1000.0, filter_length);
    gaussian_basis(filter_length, span.view())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The single-atom case (`nlevel = 2`).
    // - Shapes and normalization of the default basis.
    // - Rejection of `nlevel < 2` and empty spans.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // `nlevel = 2` gives a single bump centered at half the span.
    //
    // Given
    // -----
    // - `span = 0, 1, …, 100`, so the center is 50.
    //
    // Expect
    // ------
    // - One column; value 1 at lag 50; `W[50 − k] = W[50 + k]`.
    fn two_levels_give_one_centered_bump() {
        let span = linspace(0.0, 100.0, 101);

        let basis = gaussian_basis(2, span.view()).expect("valid basis");
        let w = basis.matrix();

        assert_eq!(w.dim(), (101, 1));
        assert_abs_diff_eq!(w[[50, 0]], 1.0, epsilon = 1e-15);
        for k in 1..=50 {
            assert_abs_diff_eq!(w[[50 - k, 0]], w[[50 + k, 0]], epsilon = 1e-15);
        }
        assert!(w[[50, 0]] > w[[40, 0]]);
    }

    #[test]
    // Purpose
    // -------
    // The default basis has `filter_length − 1` atoms and unit maximum.
    //
    // Given
    // -----
    // - `filter_length = 200`.
    //
    // Expect
    // ------
    // - Shape 200 × 199, all entries in [0, 1], maximum exactly 1.
    fn default_basis_shape_and_scale() {
        let basis = default_basis(200).expect("valid basis");

        let max = basis.matrix().iter().cloned().fold(f64::MIN, f64::max);

        assert_eq!((basis.filter_length(), basis.n_atoms()), (200, 199));
        assert_eq!(max, 1.0);
        assert!(basis.matrix().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    // Purpose
    // -------
    // Degenerate configurations fail instead of producing an empty basis.
    //
    // Given
    // -----
    // - `nlevel = 1` and `nlevel = 0` with a valid span; an empty span.
    //
    // Expect
    // ------
    // - `BasisTooSmall` and `InvalidSpan` respectively.
    fn degenerate_configurations_fail() {
        let span = linspace(0.0, 10.0, 11);
        let empty = Array1::<f64>::zeros(0);

        assert_eq!(
            gaussian_basis(1, span.view()).unwrap_err(),
            DstrfError::BasisTooSmall { nlevel: 1 }
        );
        assert_eq!(
            gaussian_basis(0, span.view()).unwrap_err(),
            DstrfError::BasisTooSmall { nlevel: 0 }
        );
        assert!(matches!(
            gaussian_basis(3, empty.view()),
            Err(DstrfError::InvalidSpan { .. })
        ));
    }
}
