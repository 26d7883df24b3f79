//! Lead field and forward model.
//!
//! Purpose
//! -------
//! Own the sensor-space forward operator `L` (channels × sources·dc) and the
//! quantities derived from it once per model: the spectral-norm scaling,
//! the initial source variance `eta`, and the initial data covariance
//! `Σ_b = noise + eta·L·Lᵀ`.
//!
//! Key behaviors
//! -------------
//! - [`LeadField::new`] divides the matrix by its largest singular value and
//!   keeps that value in [`LeadField::scaling`]. TRFs estimated against the
//!   normalized lead field are in normalized units; divide by `scaling` to
//!   express them against the raw lead field.
//! - [`LeadField::from_free`] flattens a `channels × sources × 3` array
//!   source-major, so column `n·3 + d` holds orientation `d` of source `n`.
//! - [`ForwardModel::new`] computes `eta = K / ‖chol(noise)⁻¹·L‖_F²`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Orientation dimension `dc ∈ {1, 3}` and the column count is a multiple
//!   of `dc`.
//! - The noise covariance is `K × K` symmetric positive definite.
use crate::{
    dstrf::errors::{DstrfError, DstrfResult},
    optimization::numerical_stability::linalg::{CholeskyFactor, spectral_norm},
};
use ndarray::{Array2, ArrayView2, ArrayView3, s};

/// Number of orientation components per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// One component per source (dc = 1).
    Fixed,
    /// Three Cartesian components per source (dc = 3).
    Free,
}

impl Orientation {
    /// Components per source.
    pub fn dim(self) -> usize {
        match self {
            Orientation::Fixed => 1,
            Orientation::Free => 3,
        }
    }

    /// Map a component count to an orientation.
    ///
    /// # Errors
    /// - `DstrfError::UnsupportedOrientation` for anything but 1 or 3.
    pub fn from_dim(dim: usize) -> DstrfResult<Self> {
        match dim {
            1 => Ok(Orientation::Fixed),
            3 => Ok(Orientation::Free),
            _ => Err(DstrfError::UnsupportedOrientation { dim }),
        }
    }
}

/// Spectral-norm normalized lead field.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadField {
    matrix: Array2<f64>,
    scaling: f64,
    orientation: Orientation,
}

impl LeadField {
    /// Normalize a `channels × (sources·dc)` lead field.
    ///
    /// # Errors
    /// - `InvalidLeadFieldShape` when empty or the column count is not a
    ///   multiple of `dc`.
    /// - `NonFiniteInput`, `ZeroLeadField`, `SpectralNormFailed`.
    pub fn new(matrix: Array2<f64>, orientation: Orientation) -> DstrfResult<Self> {
        let (rows, cols) = matrix.dim();
        if rows == 0 || cols == 0 {
            return Err(DstrfError::InvalidLeadFieldShape { rows, cols, reason: "empty lead field" });
        }
        if cols % orientation.dim() != 0 {
            return Err(DstrfError::InvalidLeadFieldShape {
                rows,
                cols,
                reason: "column count is not a multiple of the orientation dimension",
            });
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(DstrfError::NonFiniteInput { what: "lead field" });
        }
        let scaling = spectral_norm(matrix.view()).ok_or(DstrfError::SpectralNormFailed)?;
        if scaling <= 0.0 {
            return Err(DstrfError::ZeroLeadField);
        }
        let matrix = matrix.mapv(|v| v / scaling);
        Ok(Self { matrix, scaling, orientation })
    }

    /// Normalize a free-orientation `channels × sources × 3` lead field.
    ///
    /// # Errors
    /// - `UnsupportedOrientation` if the last axis is not 3.
    /// - Everything [`LeadField::new`] reports.
    pub fn from_free(array: ArrayView3<f64>) -> DstrfResult<Self> {
        let (k, n, d) = array.dim();
        if d != 3 {
            return Err(DstrfError::UnsupportedOrientation { dim: d });
        }
        let flat = Array2::from_shape_fn((k, n * 3), |(c, j)| array[[c, j / 3, j % 3]]);
        Self::new(flat, Orientation::Free)
    }

    /// Normalized matrix.
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// Spectral norm of the raw input.
    pub fn scaling(&self) -> f64 {
        self.scaling
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Components per source.
    pub fn dc(&self) -> usize {
        self.orientation.dim()
    }

    pub fn n_channels(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn n_sources(&self) -> usize {
        self.matrix.ncols() / self.dc()
    }

    /// Columns of source `i` (`channels × dc`).
    pub fn block(&self, i: usize) -> ArrayView2<'_, f64> {
        let dc = self.dc();
        self.matrix.slice(s![.., i * dc..(i + 1) * dc])
    }
}

/// Lead field plus noise model and the initial covariance they imply.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardModel {
    lead_field: LeadField,
    noise_cov: Array2<f64>,
    eta: f64,
    init_sigma_b: Array2<f64>,
}

impl ForwardModel {
    /// Build the forward model.
    ///
    /// # Errors
    /// - `NoiseCovarianceShape` unless `noise_cov` is `K × K`.
    /// - `NonFiniteInput`, `NoiseNotPositiveDefinite`.
    /// - `ZeroLeadField` if the whitened lead field vanishes.
    pub fn new(lead_field: LeadField, noise_cov: Array2<f64>) -> DstrfResult<Self> {
        let k = lead_field.n_channels();
        if noise_cov.dim() != (k, k) {
            return Err(DstrfError::NoiseCovarianceShape { expected: k, found: noise_cov.dim() });
        }
        if noise_cov.iter().any(|v| !v.is_finite()) {
            return Err(DstrfError::NonFiniteInput { what: "noise covariance" });
        }
        let chol = CholeskyFactor::new(noise_cov.view()).ok_or(DstrfError::NoiseNotPositiveDefinite)?;
        let whitened =
            chol.solve_lower(lead_field.matrix().view()).ok_or(DstrfError::NoiseNotPositiveDefinite)?;
        let energy = whitened.iter().map(|v| v * v).sum::<f64>();
        if energy <= 0.0 {
            return Err(DstrfError::ZeroLeadField);
        }
        let eta = k as f64 / energy;
        let l = lead_field.matrix();
        let init_sigma_b = &noise_cov + &(l.dot(&l.t()) * eta);
        Ok(Self { lead_field, noise_cov, eta, init_sigma_b })
    }

    pub fn lead_field(&self) -> &LeadField {
        &self.lead_field
    }

    pub fn noise_cov(&self) -> &Array2<f64> {
        &self.noise_cov
    }

    /// Initial per-component source variance.
    pub fn eta(&self) -> f64 {
        self.eta
    }

    /// `noise + eta·L·Lᵀ`.
    pub fn init_sigma_b(&self) -> &Array2<f64> {
        &self.init_sigma_b
    }
}
