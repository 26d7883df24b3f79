//! Sparsity penalties and their proximal maps.
//!
//! Purpose
//! -------
//! Provide the non-smooth half of the TRF objective. Fixed-orientation
//! models use an element-wise L1 penalty; free-orientation models use a
//! group penalty whose groups are the three orientation components of one
//! source at one basis coefficient.
//!
//! Key behaviors
//! -------------
//! - [`shrink`] is soft-thresholding, the proximal map of `mu·‖·‖₁`.
//! - [`prox_group`] scales each 3-vector `x[3s..3s+3, f]` by
//!   `max(1 − mu/‖block‖, 0)` via an owned `(sources, 3, F)` copy; the input
//!   is never modified.
//! - [`Penalty`] fixes the penalty type and weight for one fit and plugs into
//!   the proximal-gradient solver through [`ProximalOperator`].
//!
//! Conventions
//! -----------
//! - `prox(v, tau)` uses the effective threshold `mu·tau`.
use crate::{
    dstrf::core::lead_field::Orientation,
    optimization::proximal_gradient::{traits::ProximalOperator, types::Coefs},
};
use ndarray::{Array, Array2, Array3, ArrayBase, Data, Dimension};

/// Soft-thresholding `sign(x)·max(|x| − mu, 0)`.
pub fn shrink<S, D>(x: &ArrayBase<S, D>, mu: f64) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    x.mapv(|v| v.signum() * (v.abs() - mu).max(0.0))
}

/// `mu·Σ|x|`.
pub fn l1_penalty(x: &Array2<f64>, mu: f64) -> f64 {
    mu * x.iter().map(|v| v.abs()).sum::<f64>()
}

/// `mu·Σ_{s,f} ‖x[3s..3s+3, f]‖₂`.
///
/// Rows beyond the last full group are ignored; callers pass matrices whose
/// row count is a multiple of 3.
pub fn group_penalty(x: &Array2<f64>, mu: f64) -> f64 {
    let n_groups = x.nrows() / 3;
    let mut total = 0.0;
    for s in 0..n_groups {
        for f in 0..x.ncols() {
            let sq: f64 = (0..3).map(|d| x[[3 * s + d, f]].powi(2)).sum();
            total += sq.sqrt();
        }
    }
    mu * total
}

/// Group soft-thresholding with threshold `mu`.
pub fn prox_group(x: &Array2<f64>, mu: f64) -> Array2<f64> {
    let n_groups = x.nrows() / 3;
    let n_cols = x.ncols();
    let mut blocks = Array3::from_shape_fn((n_groups, 3, n_cols), |(s, d, f)| x[[3 * s + d, f]]);
    for s in 0..n_groups {
        for f in 0..n_cols {
            let norm = (0..3).map(|d| blocks[[s, d, f]].powi(2)).sum::<f64>().sqrt();
            let factor = if norm > 0.0 { (1.0 - mu / norm).max(0.0) } else { 0.0 };
            for d in 0..3 {
                blocks[[s, d, f]] *= factor;
            }
        }
    }
    let mut out = x.clone();
    for s in 0..n_groups {
        for d in 0..3 {
            for f in 0..n_cols {
                out[[3 * s + d, f]] = blocks[[s, d, f]];
            }
        }
    }
    out
}

/// Penalty attached to one fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Penalty {
    /// Element-wise L1, for fixed orientation.
    L1 { mu: f64 },
    /// Per-source 3-vector group norm, for free orientation.
    Group { mu: f64 },
}

impl Penalty {
    /// Penalty matching the lead-field orientation.
    pub fn for_orientation(orientation: Orientation, mu: f64) -> Self {
        match orientation {
            Orientation::Fixed => Penalty::L1 { mu },
            Orientation::Free => Penalty::Group { mu },
        }
    }

    pub fn mu(&self) -> f64 {
        match *self {
            Penalty::L1 { mu } | Penalty::Group { mu } => mu,
        }
    }
}

impl ProximalOperator for Penalty {
    fn penalty(&self, x: &Coefs) -> f64 {
        match *self {
            Penalty::L1 { mu } => l1_penalty(x, mu),
            Penalty::Group { mu } => group_penalty(x, mu),
        }
    }

    fn prox(&self, v: &Coefs, tau: f64) -> Coefs {
        match *self {
            Penalty::L1 { mu } => shrink(v, mu * tau),
            Penalty::Group { mu } => prox_group(v, mu * tau),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, s};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - `shrink` identity at zero threshold, idempotence of the zero set and
    //   contraction toward zero.
    // - Exact group shrinkage on hand-computed 3-vectors.
    // - Penalty values and the orientation-to-penalty mapping.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Basic soft-thresholding properties.
    //
    // Given
    // -----
    // - `x = [-3, -0.5, 0, 0.2, 2]`.
    //
    // Expect
    // ------
    // - `shrink(x, 0) = x`.
    // - `shrink(x, 1) = [-2, 0, 0, 0, 1]`.
    // - `|shrink(x, mu)| ≤ |x|` and applying the same threshold to a zero
    //   entry leaves it at zero.
    fn shrink_properties() {
        let x = array![-3.0, -0.5, 0.0, 0.2, 2.0];

        let same = shrink(&x, 0.0);
        let shrunk = shrink(&x, 1.0);
        let again = shrink(&shrunk, 1.0);

        assert_eq!(same, x);
        assert_eq!(shrunk, array![-2.0, 0.0, 0.0, 0.0, 1.0]);
        for (s, v) in shrunk.iter().zip(x.iter()) {
            assert!(s.abs() <= v.abs());
        }
        for (a, s) in again.iter().zip(shrunk.iter()) {
            if *s == 0.0 {
                assert_eq!(*a, 0.0);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Group shrinkage scales each 3-vector by `1 − mu/‖v‖` or zeroes it.
    //
    // Given
    // -----
    // - Source 0, column 0: `(3, 4, 0)`, norm 5. Source 1, column 0:
    //   `(0.3, 0.4, 0)`, norm 0.5. Column 1 is zero. `mu = 1`.
    //
    // Expect
    // ------
    // - Source 0 becomes `(2.4, 3.2, 0)`; source 1 is zeroed; the zero
    //   column stays zero; input untouched; shape unchanged.
    fn group_shrink_is_exact() {
        let mut x = Array2::zeros((6, 2));
        x[[0, 0]] = 3.0;
        x[[1, 0]] = 4.0;
        x[[3, 0]] = 0.3;
        x[[4, 0]] = 0.4;
        let before = x.clone();

        let out = prox_group(&x, 1.0);

        assert_eq!(out.dim(), (6, 2));
        assert_abs_diff_eq!(out[[0, 0]], 2.4, epsilon = 1e-12);
        assert_abs_diff_eq!(out[[1, 0]], 3.2, epsilon = 1e-12);
        assert_eq!(out[[2, 0]], 0.0);
        assert!(out.slice(s![3..6, ..]).iter().all(|&v| v == 0.0));
        assert!(out.column(1).iter().all(|&v| v == 0.0));
        assert_eq!(x, before);
    }

    #[test]
    // Purpose
    // -------
    // Penalty values and dispatch through `ProximalOperator`.
    //
    // Given
    // -----
    // - The matrix from the group test and `mu = 2`.
    //
    // Expect
    // ------
    // - L1: `2·(3 + 4 + 0.3 + 0.4) = 15.4`; group: `2·(5 + 0.5) = 11`.
    // - `Penalty::L1.prox(v, 0.5)` equals `shrink(v, 1)`.
    fn penalty_values_and_dispatch() {
        let mut x = Array2::zeros((6, 1));
        x[[0, 0]] = 3.0;
        x[[1, 0]] = 4.0;
        x[[3, 0]] = 0.3;
        x[[4, 0]] = 0.4;
        let l1 = Penalty::for_orientation(Orientation::Fixed, 2.0);
        let group = Penalty::for_orientation(Orientation::Free, 2.0);

        assert_abs_diff_eq!(l1.penalty(&x), 15.4, epsilon = 1e-12);
        assert_abs_diff_eq!(group.penalty(&x), 11.0, epsilon = 1e-12);
        assert_eq!(l1.prox(&x, 0.5), shrink(&x, 1.0));
        assert_eq!(group.mu(), 2.0);
    }
}
