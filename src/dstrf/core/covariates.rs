//! Stimulus inputs and lag-embedded covariates.
//!
//! A stimulus with `P` predictor streams of length `T` becomes a covariate
//! matrix of shape `T' × (P·n_atoms)` with `T' = T − filter_length + 1`:
//! row `i` holds, for every predictor, the reversed window
//! `stim[p, i .. i + filter_length]` (most recent sample first) projected
//! onto the temporal basis. Columns are predictor-major, so predictor `p`
//! owns columns `p·n_atoms .. (p + 1)·n_atoms`.
use crate::dstrf::{
    core::basis::TemporalBasis,
    errors::{DstrfError, DstrfResult},
};
use ndarray::{Array2, ArrayView1, ArrayView2, s};

/// A single stimulus series or a stack of predictor streams (rows).
#[derive(Debug, Clone, Copy)]
pub enum Stimulus<'a> {
    Single(ArrayView1<'a, f64>),
    Multiple(ArrayView2<'a, f64>),
}

impl<'a> Stimulus<'a> {
    /// Number of predictor streams.
    pub fn n_predictors(&self) -> usize {
        match self {
            Stimulus::Single(_) => 1,
            Stimulus::Multiple(m) => m.nrows(),
        }
    }

    /// Number of time samples.
    pub fn n_times(&self) -> usize {
        match self {
            Stimulus::Single(v) => v.len(),
            Stimulus::Multiple(m) => m.ncols(),
        }
    }

    /// Owned `P × T` copy.
    pub fn to_matrix(&self) -> Array2<f64> {
        match self {
            Stimulus::Single(v) => v.to_owned().insert_axis(ndarray::Axis(0)),
            Stimulus::Multiple(m) => m.to_owned(),
        }
    }
}

/// Centre every predictor stream and scale it to unit standard deviation.
///
/// Constant streams are only centred.
pub fn standardize_streams(stim: &mut Array2<f64>) {
    let n = stim.ncols() as f64;
    if n == 0.0 {
        return;
    }
    for mut row in stim.rows_mut() {
        let mean = row.sum() / n;
        row.mapv_inplace(|v| v - mean);
        let sd = (row.iter().map(|v| v * v).sum::<f64>() / n).sqrt();
        if sd > 0.0 {
            row.mapv_inplace(|v| v / sd);
        }
    }
}

/// Lag embedding of one stream: `T' × filter_length`, row `i`, column `k`
/// holds `x[i + filter_length − 1 − k]`.
pub fn lag_matrix(x: ArrayView1<f64>, filter_length: usize) -> Array2<f64> {
    let n_rows = (x.len() + 1).saturating_sub(filter_length);
    Array2::from_shape_fn((n_rows, filter_length), |(i, k)| x[i + filter_length - 1 - k])
}

/// Basis-projected covariates for a `P × T` stimulus.
///
/// Returns the unnormalized `T' × (P·n_atoms)` matrix.
///
/// # Errors
/// - `DstrfError::SeriesTooShort` if `T < filter_length`.
pub fn covariate_from_stim(
    key: &str, stim: ArrayView2<f64>, basis: &TemporalBasis,
) -> DstrfResult<Array2<f64>> {
    let m = basis.filter_length();
    let n_times = stim.ncols();
    if n_times < m {
        return Err(DstrfError::SeriesTooShort {
            key: key.to_string(),
            length: n_times,
            filter_length: m,
        });
    }
    let n_atoms = basis.n_atoms();
    let n_rows = n_times - m + 1;
    let mut out = Array2::zeros((n_rows, stim.nrows() * n_atoms));
    for (p, stream) in stim.rows().into_iter().enumerate() {
        let projected = lag_matrix(stream, m).dot(basis.matrix());
        out.slice_mut(s![.., p * n_atoms..(p + 1) * n_atoms]).assign(&projected);
    }
    Ok(out)
}
