//! DstRf — alternating FASTA / Champagne estimation of spatio-temporal TRFs.
//!
//! Purpose
//! -------
//! Drive the outer loop: each iteration whitens the data with the current
//! per-trial `Σ_b`, re-estimates `theta` with FASTA under the orientation's
//! sparsity penalty, measures the relative change of `theta`, and, unless
//! that change is below `tol`, re-estimates the covariances with Champagne.
//!
//! Key behaviors
//! -------------
//! - [`DstRf::fit`] slices the data when `FitOptions::idx` is set, computes
//!   sufficient statistics if needed, creates a fresh [`FitState`], runs
//!   [`DstRf::run_fit`], and stores state and outcome on the model.
//! - [`DstRf::run_fit`] is the resumable core: it advances a caller-owned
//!   state and never touches the model.
//! - The penalty is chosen from the lead-field orientation: L1 for fixed,
//!   group norm for free.
//!
//! Invariants & assumptions
//! ------------------------
//! - `err = ‖θ_new − θ‖_F / ‖θ‖_F`, and `+∞` while `θ = 0`, so the first
//!   entry of `err_history` is always `+∞` for a fresh state.
//! - Exhausting `n_iter` is not an error; `FitOutcome::converged` is false.
//! - The model's `IterationBudget::n_iterf` overrides
//!   `FitOptions::fasta.max_iter`.
//!
//! Conventions
//! -----------
//! - With `FitOptions::verbose`, `objective_history` records `eval_obj`
//!   after every Champagne update. Progress lines go to stderr only when the
//!   crate is built with `obs_slog`.
use crate::{
    dstrf::{
        core::{
            data::RegData,
            gamma::EigenBackend,
            lead_field::{ForwardModel, LeadField},
            options::{FitOptions, IterationBudget},
            penalty::Penalty,
            state::FitState,
            trf::{SourceGeometry, TrfSet, expand_theta},
        },
        errors::{DstrfError, DstrfResult},
        models::{champagne, diagnostics::eval_obj, objective::TrfObjective},
    },
    optimization::proximal_gradient::{api::minimize_composite, traits::FastaOutcome},
};
use ndarray::Array2;
use std::borrow::Cow;

/// Summary of one FASTA solve.
#[derive(Debug, Clone, PartialEq)]
pub struct FastaSummary {
    pub iterations: usize,
    pub value: f64,
    pub converged: bool,
    pub status: String,
}

impl From<&FastaOutcome> for FastaSummary {
    fn from(out: &FastaOutcome) -> Self {
        Self {
            iterations: out.iterations,
            value: out.value,
            converged: out.converged,
            status: out.status.clone(),
        }
    }
}

/// Record of one fit.
///
/// - `err_history[k]`: relative change of `theta` at outer iteration `k`.
/// - `objective_history`: `eval_obj` after each Champagne update (verbose
///   fits only).
/// - `converged`: the last `err` fell below `tol`.
/// - `iterations`: outer iterations performed.
/// - `inner`: one entry per FASTA solve.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutcome {
    pub err_history: Vec<f64>,
    pub objective_history: Vec<f64>,
    pub converged: bool,
    pub iterations: usize,
    pub inner: Vec<FastaSummary>,
}

/// Spatio-temporal TRF model with Champagne source priors.
#[derive(Debug, Clone, PartialEq)]
pub struct DstRf {
    /// Normalized lead field, noise covariance and initial covariance.
    pub forward: ForwardModel,
    /// Source grid attached to every TRF.
    pub source: SourceGeometry,
    /// Outer / Champagne / FASTA iteration counts.
    pub budget: IterationBudget,
    /// State after the last `fit`.
    pub state: Option<FitState>,
    /// Outcome of the last `fit`.
    pub results: Option<FitOutcome>,
    /// Regularization weight of the last `fit`.
    pub mu: Option<f64>,
}

impl DstRf {
    /// Build a model.
    ///
    /// # Errors
    /// - Everything `ForwardModel::new` reports.
    /// - `SourceGeometryMismatch` if `source` does not list one entry per
    ///   lead-field source.
    pub fn new(
        lead_field: LeadField, noise_cov: Array2<f64>, source: SourceGeometry,
        budget: IterationBudget,
    ) -> DstrfResult<Self> {
        let n_sources = lead_field.n_sources();
        if source.len() != n_sources {
            return Err(DstrfError::SourceGeometryMismatch {
                expected: n_sources,
                found: source.len(),
            });
        }
        let forward = ForwardModel::new(lead_field, noise_cov)?;
        Ok(Self { forward, source, budget, state: None, results: None, mu: None })
    }

    /// Fresh state for `data` (`theta = 0`, `Γ = eta·I`, initial `Σ_b`).
    pub fn init_state(&self, data: &RegData) -> DstrfResult<FitState> {
        FitState::init(&self.forward, data)
    }

    /// Estimate TRFs and source covariances on `data`.
    ///
    /// Parameters
    /// ----------
    /// - `data`: loaded trials; statistics are computed on a copy if missing.
    /// - `mu`: sparsity weight, finite and `≥ 0`.
    /// - `opts`: validated here; `opts.idx` restricts every trial to those
    ///   time indices.
    ///
    /// Errors
    /// ------
    /// - Configuration errors from `opts`, `mu` or `timeslice`.
    /// - Numerical errors from the objective, FASTA or Champagne.
    pub fn fit(&mut self, data: &RegData, mu: f64, opts: &FitOptions) -> DstrfResult<()> {
        opts.validate()?;
        let mut working = match &opts.idx {
            Some(idx) => Cow::Owned(data.timeslice(idx)?),
            None => Cow::Borrowed(data),
        };
        if !working.is_precomputed() {
            working.to_mut().precompute()?;
        }
        let mut state = self.init_state(&working)?;
        let outcome = self.run_fit(&working, mu, opts, &mut state)?;
        self.state = Some(state);
        self.results = Some(outcome);
        self.mu = Some(mu);
        Ok(())
    }

    /// Advance `state` by up to `n_iter` outer iterations on precomputed
    /// `data`. `opts.idx` is ignored; slice the data beforehand.
    ///
    /// # Errors
    /// - `InvalidMu`, `StatisticsNotComputed`, `ThetaShapeMismatch`.
    /// - Numerical errors from the objective, FASTA or Champagne.
    pub fn run_fit(
        &self, data: &RegData, mu: f64, opts: &FitOptions, state: &mut FitState,
    ) -> DstrfResult<FitOutcome> {
        if !mu.is_finite() || mu < 0.0 {
            return Err(DstrfError::InvalidMu { value: mu });
        }
        opts.validate()?;
        if !data.is_precomputed() {
            return Err(DstrfError::StatisticsNotComputed);
        }
        state.check_shape(&self.forward, data)?;

        let penalty = Penalty::for_orientation(self.forward.lead_field().orientation(), mu);
        let mut fasta = opts.fasta.with_max_iter(self.budget.n_iterf)?;
        fasta.verbose |= opts.verbose;
        let n_iterc = opts.n_iterc.unwrap_or(self.budget.n_iterc);
        let backend = EigenBackend::select(opts.use_accelerated);

        let mut outcome = FitOutcome {
            err_history: Vec::with_capacity(self.budget.n_iter),
            objective_history: Vec::new(),
            converged: false,
            iterations: 0,
            inner: Vec::with_capacity(self.budget.n_iter),
        };
        for it in 0..self.budget.n_iter {
            let objective = TrfObjective::assemble(&self.forward, data, state)?;
            let solved = minimize_composite(&objective, &penalty, state.theta.clone(), &fasta)?;
            let err = relative_change(&state.theta, &solved.theta_hat);
            outcome.inner.push(FastaSummary::from(&solved));
            state.theta = solved.theta_hat;
            outcome.err_history.push(err);
            outcome.iterations = it + 1;
            #[cfg(feature = "obs_slog")]
            if opts.verbose {
                eprintln!("iteration {it}: fasta f+g = {:.6}, err = {err:.3e}", solved.value);
            }
            if err < opts.tol {
                outcome.converged = true;
                break;
            }
            champagne::solve(&self.forward, data, state, n_iterc, &backend)?;
            if opts.verbose {
                let obj = eval_obj(&self.forward, state, data)?;
                outcome.objective_history.push(obj);
                #[cfg(feature = "obs_slog")]
                eprintln!("iteration {it}: objective after champagne = {obj:.6}");
            }
        }
        Ok(outcome)
    }

    /// Fitted coefficients.
    ///
    /// # Errors
    /// - `DstrfError::ModelNotFitted` before `fit`.
    pub fn theta(&self) -> DstrfResult<&Array2<f64>> {
        self.state.as_ref().map(|s| &s.theta).ok_or(DstrfError::ModelNotFitted)
    }

    /// Fitted state.
    ///
    /// # Errors
    /// - `DstrfError::ModelNotFitted` before `fit`.
    pub fn fitted_state(&self) -> DstrfResult<&FitState> {
        self.state.as_ref().ok_or(DstrfError::ModelNotFitted)
    }

    /// Basis-expanded TRFs, one per predictor, on the lag axis of `data`.
    ///
    /// Amplitudes are relative to the normalized lead field; divide by
    /// [`DstRf::scaling`] to refer them to the raw lead field.
    ///
    /// # Errors
    /// - `ModelNotFitted`, `NoTrials`, `ThetaShapeMismatch`.
    pub fn get_strf(&self, data: &RegData) -> DstrfResult<TrfSet> {
        let state = self.fitted_state()?;
        state.check_shape(&self.forward, data)?;
        let n_predictors = data.n_predictors().ok_or(DstrfError::NoTrials)?;
        let tstep = data.tstep().ok_or(DstrfError::NoTrials)?;
        Ok(expand_theta(
            &state.theta,
            data.basis().matrix(),
            n_predictors,
            self.forward.lead_field().orientation(),
            &self.source,
            tstep,
        ))
    }

    /// Spectral norm the lead field was divided by.
    pub fn scaling(&self) -> f64 {
        self.forward.lead_field().scaling()
    }

    /// Drop any fitted state, keeping the forward model and budget.
    pub fn reset(&mut self) {
        self.state = None;
        self.results = None;
        self.mu = None;
    }
}

/// `‖new − old‖_F / ‖old‖_F`; from `old = 0` it is `+∞`, or `0` when
/// `new` is zero as well.
pub fn relative_change(old: &Array2<f64>, new: &Array2<f64>) -> f64 {
    let num = old.iter().zip(new.iter()).map(|(a, b)| (b - a) * (b - a)).sum::<f64>();
    let den = old.iter().map(|v| v * v).sum::<f64>();
    if den == 0.0 {
        return if num == 0.0 { 0.0 } else { f64::INFINITY };
    }
    (num / den).sqrt()
}
