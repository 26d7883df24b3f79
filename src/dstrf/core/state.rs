//! Explicit optimization state threaded through a fit.
//!
//! [`FitState`] owns the TRF coefficients and, per trial key, the source
//! covariance blocks `Γ` and the data covariance `Σ_b`. The outer driver
//! creates it, the FASTA step replaces `theta`, and the Champagne step
//! replaces the covariances; nothing else mutates it. Passing a state back
//! into `DstRf::run_fit` resumes a fit.
use crate::dstrf::{
    core::{data::RegData, lead_field::ForwardModel},
    errors::{DstrfError, DstrfResult},
};
use ndarray::Array2;
use std::collections::HashMap;

/// Covariances of one trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialCovariance {
    /// One `dc × dc` block per source.
    pub gamma: Vec<Array2<f64>>,
    /// `K × K` data covariance.
    pub sigma_b: Array2<f64>,
}

/// Coefficients plus per-trial covariances.
#[derive(Debug, Clone, PartialEq)]
pub struct FitState {
    /// `(sources·dc) × (predictors·n_atoms)`.
    pub theta: Array2<f64>,
    pub covariances: HashMap<String, TrialCovariance>,
}

impl FitState {
    /// `theta = 0`, `Γ_i = eta·I`, `Σ_b = noise + eta·L·Lᵀ` for every trial.
    ///
    /// # Errors
    /// - `DstrfError::NoTrials` on an empty container.
    /// - `DstrfError::ChannelCountMismatch` if the data and lead field
    ///   disagree on the number of channels.
    pub fn init(forward: &ForwardModel, data: &RegData) -> DstrfResult<Self> {
        let n_features = data.n_features().ok_or(DstrfError::NoTrials)?;
        let lf = forward.lead_field();
        let k = lf.n_channels();
        if let Some(found) = data.n_channels() {
            if found != k {
                let key = data.trials().first().map(|t| t.key.clone()).unwrap_or_default();
                return Err(DstrfError::ChannelCountMismatch { key, expected: k, found });
            }
        }
        let dc = lf.dc();
        let gamma0 = Array2::<f64>::eye(dc) * forward.eta();
        let covariances = data
            .trials()
            .iter()
            .map(|t| {
                let cov = TrialCovariance {
                    gamma: vec![gamma0.clone(); lf.n_sources()],
                    sigma_b: forward.init_sigma_b().clone(),
                };
                (t.key.clone(), cov)
            })
            .collect();
        Ok(Self { theta: Array2::zeros((lf.n_sources() * dc, n_features)), covariances })
    }

    /// Covariances of trial `key`.
    ///
    /// # Errors
    /// - `DstrfError::UnknownTrial` when the state has no entry for `key`.
    pub fn covariance(&self, key: &str) -> DstrfResult<&TrialCovariance> {
        self.covariances.get(key).ok_or_else(|| DstrfError::UnknownTrial { key: key.to_string() })
    }

    /// Check that `theta` fits `forward` and `data`.
    pub fn check_shape(&self, forward: &ForwardModel, data: &RegData) -> DstrfResult<()> {
        let n_features = data.n_features().ok_or(DstrfError::NoTrials)?;
        let expected = (forward.lead_field().matrix().ncols(), n_features);
        if self.theta.dim() != expected {
            return Err(DstrfError::ThetaShapeMismatch { expected, found: self.theta.dim() });
        }
        Ok(())
    }
}
