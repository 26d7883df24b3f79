//! TRF output types.
//!
//! Purpose
//! -------
//! Carry basis-expanded TRFs back to the caller together with the lag axis
//! and the source geometry supplied at model construction.
//!
//! Conventions
//! -----------
//! - A [`Trf`] is a `sources × dc × lags` array for one predictor.
//! - The lag axis starts at 0 and advances by the data's time step.
//! - [`TrfSet::combine`] stacks predictors on a new leading axis.
use crate::dstrf::{
    core::lead_field::Orientation,
    errors::{DstrfError, DstrfResult},
};
use ndarray::{Array1, Array2, Array3, Array4, Axis, s};

/// Uniform lag axis `tmin, tmin + tstep, …` with `n` points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAxis {
    pub tmin: f64,
    pub tstep: f64,
    pub n: usize,
}

impl TimeAxis {
    /// Lag values.
    pub fn times(&self) -> Array1<f64> {
        Array1::from_shape_fn(self.n, |i| self.tmin + self.tstep * i as f64)
    }
}

/// Read-only description of the source grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceGeometry {
    labels: Vec<String>,
    positions: Option<Array2<f64>>,
}

impl SourceGeometry {
    /// Labelled sources with optional `n × 3` positions.
    ///
    /// # Errors
    /// - `DstrfError::SourceGeometryMismatch` if `positions` has a different
    ///   row count than `labels`.
    /// - `DstrfError::NonFiniteInput` for non-finite positions.
    pub fn new(labels: Vec<String>, positions: Option<Array2<f64>>) -> DstrfResult<Self> {
        if let Some(pos) = &positions {
            if pos.nrows() != labels.len() {
                return Err(DstrfError::SourceGeometryMismatch {
                    expected: labels.len(),
                    found: pos.nrows(),
                });
            }
            if pos.iter().any(|v| !v.is_finite()) {
                return Err(DstrfError::NonFiniteInput { what: "source positions" });
            }
        }
        Ok(Self { labels, positions })
    }

    /// Sources labelled `"0"`, `"1"`, … without positions.
    pub fn anonymous(n_sources: usize) -> Self {
        Self { labels: (0..n_sources).map(|i| i.to_string()).collect(), positions: None }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn positions(&self) -> Option<&Array2<f64>> {
        self.positions.as_ref()
    }
}

/// TRF of one predictor.
#[derive(Debug, Clone, PartialEq)]
pub struct Trf {
    /// `sources × dc × lags`.
    pub data: Array3<f64>,
    pub time: TimeAxis,
    pub orientation: Orientation,
    pub source: SourceGeometry,
    /// Index of the predictor stream this TRF responds to.
    pub predictor: usize,
}

/// One TRF per predictor stream.
#[derive(Debug, Clone, PartialEq)]
pub struct TrfSet {
    pub trfs: Vec<Trf>,
}

impl TrfSet {
    pub fn len(&self) -> usize {
        self.trfs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trfs.is_empty()
    }

    /// Stack into a `predictors × sources × dc × lags` array.
    pub fn combine(&self) -> Array4<f64> {
        let Some(first) = self.trfs.first() else {
            return Array4::zeros((0, 0, 0, 0));
        };
        let (n, dc, m) = first.data.dim();
        let mut out = Array4::zeros((self.trfs.len(), n, dc, m));
        for (mut slot, trf) in out.axis_iter_mut(Axis(0)).zip(self.trfs.iter()) {
            slot.assign(&trf.data);
        }
        out
    }

    /// TRF of predictor `p`, if present.
    pub fn predictor(&self, p: usize) -> Option<&Trf> {
        self.trfs.iter().find(|t| t.predictor == p)
    }
}

/// Expand coefficients through the basis into one TRF per predictor.
///
/// `theta` is `(sources·dc) × (predictors·n_atoms)` and `basis` is
/// `lags × n_atoms`; predictor `p` owns columns `p·n_atoms..(p + 1)·n_atoms`.
pub fn expand_theta(
    theta: &Array2<f64>, basis: &Array2<f64>, n_predictors: usize, orientation: Orientation,
    source: &SourceGeometry, tstep: f64,
) -> TrfSet {
    let dc = orientation.dim();
    let n_sources = theta.nrows() / dc;
    let n_atoms = basis.ncols();
    let n_lags = basis.nrows();
    let time = TimeAxis { tmin: 0.0, tstep, n: n_lags };
    let trfs = (0..n_predictors)
        .map(|p| {
            let block = theta.slice(s![.., p * n_atoms..(p + 1) * n_atoms]);
            let expanded = block.dot(&basis.t());
            let data = Array3::from_shape_fn((n_sources, dc, n_lags), |(i, d, k)| {
                expanded[[i * dc + d, k]]
            });
            Trf { data, time, orientation, source: source.clone(), predictor: p }
        })
        .collect();
    TrfSet { trfs }
}
