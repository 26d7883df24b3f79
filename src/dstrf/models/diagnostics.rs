//! Diagnostics — objective values, cross-validation errors and estimation
//! stability for fitted models.
//!
//! Purpose
//! -------
//! Score a fitted state on (possibly held-out) data. With
//! `y = meg − L·θ·covᵀ` and `Lc = chol(Σ_b)` of the trial:
//!
//! - [`eval_obj`]: mean over trials of `0.5·‖Lc⁻¹y‖_F² + Σ log diag(Lc)`.
//! - [`eval_cv`]: mean over trials of `0.5·‖Lc⁻¹y‖_F²`.
//! - [`eval_cv1`]: mean over trials of `0.5·‖y‖_F²`.
//! - [`compute_es_metric`]: estimation stability across models,
//!   `mean_m ‖Y_m − Ȳ‖² / ‖Ȳ‖²` with `Y_m` the stacked predictions.
//!
//! Invariants & assumptions
//! ------------------------
//! - The state must hold a covariance for every trial key of `data`;
//!   `timeslice` keeps keys, so held-out slices qualify.
//! - Predictions use the covariates of `data`, never cached statistics.
//!
//! Conventions
//! -----------
//! - Per-trial terms are computed in parallel and summed in trial order.
use crate::{
    dstrf::{
        core::{data::RegData, lead_field::ForwardModel, state::FitState},
        errors::{DstrfError, DstrfResult},
        models::dstrf::DstRf,
    },
    optimization::numerical_stability::linalg::CholeskyFactor,
};
use ndarray::Array2;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Whitening {
    Raw,
    Residual,
    ResidualAndLogDet,
}

fn mean_over_trials(
    forward: &ForwardModel, state: &FitState, data: &RegData, whitening: Whitening,
) -> DstrfResult<f64> {
    if data.is_empty() {
        return Err(DstrfError::NoTrials);
    }
    state.check_shape(forward, data)?;
    let lf = forward.lead_field().matrix();
    let prediction_map = lf.dot(&state.theta);
    let parts: Vec<DstrfResult<f64>> = data
        .trials()
        .par_iter()
        .map(|trial| {
            let y = &trial.meg - &prediction_map.dot(&trial.covariates.t());
            if whitening == Whitening::Raw {
                return Ok(0.5 * squared_norm(&y));
            }
            let cov = state.covariance(&trial.key)?;
            let failed = || DstrfError::NotPositiveDefinite {
                trial: trial.key.clone(),
                stage: "diagnostic sigma_b",
            };
            let chol = CholeskyFactor::new(cov.sigma_b.view()).ok_or_else(failed)?;
            let white = chol.solve_lower(y.view()).ok_or_else(failed)?;
            let mut v = 0.5 * squared_norm(&white);
            if whitening == Whitening::ResidualAndLogDet {
                v += chol.log_diag_sum();
            }
            Ok(v)
        })
        .collect();
    let parts = parts.into_iter().collect::<DstrfResult<Vec<_>>>()?;
    Ok(parts.iter().sum::<f64>() / parts.len() as f64)
}

fn squared_norm(a: &Array2<f64>) -> f64 {
    a.iter().map(|v| v * v).sum()
}

/// Negative log-likelihood (up to constants) averaged over trials.
///
/// # Errors
/// - `NoTrials`, `ThetaShapeMismatch`, `UnknownTrial`.
/// - `NotPositiveDefinite { stage: "diagnostic sigma_b" }`.
pub fn eval_obj(forward: &ForwardModel, state: &FitState, data: &RegData) -> DstrfResult<f64> {
    mean_over_trials(forward, state, data, Whitening::ResidualAndLogDet)
}

/// Whitened squared residual averaged over trials.
///
/// # Errors
/// - As [`eval_obj`].
pub fn eval_cv(forward: &ForwardModel, state: &FitState, data: &RegData) -> DstrfResult<f64> {
    mean_over_trials(forward, state, data, Whitening::Residual)
}

/// Unwhitened squared residual averaged over trials.
///
/// # Errors
/// - `NoTrials`, `ThetaShapeMismatch`.
pub fn eval_cv1(forward: &ForwardModel, state: &FitState, data: &RegData) -> DstrfResult<f64> {
    mean_over_trials(forward, state, data, Whitening::Raw)
}

/// Estimation-stability metric of a set of fitted models on `data`.
///
/// Each model predicts `L_m·θ_m·covᵀ` for every trial; predictions are
/// stacked in trial order into `Y_m`. With `Ȳ` the mean prediction,
/// returns `mean_m ‖Y_m − Ȳ‖² / ‖Ȳ‖²`: 0 when all models agree and `+∞`
/// when they disagree around a zero mean.
///
/// # Errors
/// - `EmptyModelSet` for an empty slice; `NoTrials` for empty data.
/// - `ModelNotFitted`, `ThetaShapeMismatch` for any model.
pub fn compute_es_metric(models: &[&DstRf], data: &RegData) -> DstrfResult<f64> {
    if models.is_empty() {
        return Err(DstrfError::EmptyModelSet);
    }
    if data.is_empty() {
        return Err(DstrfError::NoTrials);
    }
    let predictions = models
        .iter()
        .map(|model| {
            let state = model.fitted_state()?;
            state.check_shape(&model.forward, data)?;
            let map = model.forward.lead_field().matrix().dot(&state.theta);
            let mut stacked = Vec::new();
            for trial in data.trials() {
                stacked.extend(map.dot(&trial.covariates.t()).iter().copied());
            }
            Ok(stacked)
        })
        .collect::<DstrfResult<Vec<Vec<f64>>>>()?;

    let n_models = predictions.len() as f64;
    let len = predictions[0].len();
    let mut mean = vec![0.0; len];
    for y in &predictions {
        for (m, v) in mean.iter_mut().zip(y) {
            *m += v / n_models;
        }
    }
    let var = predictions
        .iter()
        .map(|y| y.iter().zip(&mean).map(|(v, m)| (v - m) * (v - m)).sum::<f64>())
        .sum::<f64>()
        / n_models;
    let energy = mean.iter().map(|m| m * m).sum::<f64>();
    if var == 0.0 {
        return Ok(0.0);
    }
    if energy == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(var / energy)
}

impl DstRf {
    /// [`eval_obj`] with the fitted state.
    pub fn eval_obj(&self, data: &RegData) -> DstrfResult<f64> {
        eval_obj(&self.forward, self.fitted_state()?, data)
    }

    /// [`eval_cv`] with the fitted state.
    pub fn eval_cv(&self, data: &RegData) -> DstrfResult<f64> {
        eval_cv(&self.forward, self.fitted_state()?, data)
    }

    /// [`eval_cv1`] with the fitted state.
    pub fn eval_cv1(&self, data: &RegData) -> DstrfResult<f64> {
        eval_cv1(&self.forward, self.fitted_state()?, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dstrf::core::{
        basis::{gaussian_basis, linspace},
        covariates::Stimulus,
        lead_field::{LeadField, Orientation},
        options::IterationBudget,
        trf::SourceGeometry,
    };
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, array};
    use ndarray_rand::{
        RandomExt,
        rand::{SeedableRng, rngs::StdRng},
        rand_distr::StandardNormal,
    };

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The three residual scores on a hand-built state with identity
    //   covariance, where all whitening is trivial.
    // - The log-determinant term of `eval_obj`.
    // - The ES metric: zero for identical models, positive otherwise,
    //   errors for empty and unfitted inputs.
    // -------------------------------------------------------------------------

    fn fixture() -> (DstRf, RegData) {
        let mut rng = StdRng::seed_from_u64(17);
        let basis = gaussian_basis(3, linspace(0.0, 20.0, 4).view()).expect("basis");
        let mut data = RegData::with_basis(basis);
        for key in ["a", "b"] {
            let meg = Array2::<f64>::random_using((2, 30), StandardNormal, &mut rng);
            let stim = Array1::<f64>::random_using(30, StandardNormal, &mut rng);
            data.load(key, meg.view(), 0.01, Stimulus::Single(stim.view()), false).expect("load");
        }
        let lf = LeadField::new(array![[1.0, 0.0], [0.0, 1.0]], Orientation::Fixed).expect("lf");
        let model = DstRf::new(lf, Array2::eye(2), SourceGeometry::anonymous(2), IterationBudget::default())
            .expect("model");
        (model, data)
    }

    fn with_state(model: &DstRf, data: &RegData, theta: Array2<f64>, sigma: f64) -> DstRf {
        let mut state = model.init_state(data).expect("state");
        state.theta = theta;
        for cov in state.covariances.values_mut() {
            cov.sigma_b = Array2::<f64>::eye(2) * sigma;
        }
        let mut fitted = model.clone();
        fitted.state = Some(state);
        fitted
    }

    #[test]
    // Purpose
    // -------
    // With `Σ_b = I` the whitened and unwhitened residual scores agree and
    // the log-determinant vanishes.
    //
    // Given
    // -----
    // - `theta = 0`, so `y = meg`; identity `Σ_b` for both trials.
    //
    // Expect
    // ------
    // - `eval_cv = eval_cv1 = eval_obj = mean 0.5·‖meg‖²`.
    fn identity_covariance_scores_agree() {
        let (model, data) = fixture();
        let fitted = with_state(&model, &data, Array2::zeros((2, 2)), 1.0);
        let expected = data
            .trials()
            .iter()
            .map(|t| 0.5 * t.meg.iter().map(|v| v * v).sum::<f64>())
            .sum::<f64>()
            / 2.0;

        let cv = fitted.eval_cv(&data).expect("cv");
        let cv1 = fitted.eval_cv1(&data).expect("cv1");
        let obj = fitted.eval_obj(&data).expect("obj");

        assert_abs_diff_eq!(cv, expected, epsilon = 1e-12);
        assert_abs_diff_eq!(cv1, expected, epsilon = 1e-12);
        assert_abs_diff_eq!(obj, expected, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Scaling `Σ_b` by 4 halves the whitened residual twice and adds
    // `K·log 2` per trial.
    //
    // Given
    // -----
    // - `theta = 0`, `Σ_b = 4·I` with `K = 2` channels.
    //
    // Expect
    // ------
    // - `eval_cv = eval_cv1 / 4`; `eval_obj = eval_cv + 2·ln 2`.
    fn log_determinant_term() {
        let (model, data) = fixture();
        let fitted = with_state(&model, &data, Array2::zeros((2, 2)), 4.0);

        let cv = fitted.eval_cv(&data).expect("cv");
        let cv1 = fitted.eval_cv1(&data).expect("cv1");
        let obj = fitted.eval_obj(&data).expect("obj");

        assert_abs_diff_eq!(cv, cv1 / 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(obj, cv + 2.0 * 2.0_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Identical models are perfectly stable; differing ones are not.
    //
    // Given
    // -----
    // - Two copies of a model with `theta = 1`; a third with `theta = 2`.
    //
    // Expect
    // ------
    // - ES of the copies is exactly 0.
    // - ES of `{θ, 2θ}` is `mean(‖0.5Y‖², ‖0.5Y‖²)/‖1.5Y‖² = 1/9`.
    fn es_metric_zero_for_identical_models() {
        let (model, data) = fixture();
        let one = with_state(&model, &data, Array2::ones((2, 2)), 1.0);
        let two = with_state(&model, &data, Array2::ones((2, 2)) * 2.0, 1.0);

        let same = compute_es_metric(&[&one, &one.clone()], &data).expect("es");
        let differ = compute_es_metric(&[&one, &two], &data).expect("es");

        assert_eq!(same, 0.0);
        assert_abs_diff_eq!(differ, 1.0 / 9.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // The ES metric needs fitted models.
    //
    // Given
    // -----
    // - An empty slice; an unfitted model.
    //
    // Expect
    // ------
    // - `EmptyModelSet`; `ModelNotFitted`.
    fn es_metric_errors() {
        let (model, data) = fixture();

        assert_eq!(compute_es_metric(&[], &data).unwrap_err(), DstrfError::EmptyModelSet);
        assert_eq!(compute_es_metric(&[&model], &data).unwrap_err(), DstrfError::ModelNotFitted);
    }
}
